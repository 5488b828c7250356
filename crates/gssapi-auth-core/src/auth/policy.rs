//! Principal to policy mapping.
//!
//! This module provides policy storage backends consulted after a security
//! context completes, and the [`ConfigStore`] view the login path reads.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use crate::config::{BackendConfig, PolicyConfig, PrincipalPolicies};
use crate::error::{AuthError, AuthResult};
use crate::lease::LeaseDefaults;

use super::principal::AuthenticatedPrincipal;

/// Trait for policy storage backends.
pub trait PolicyStore: Send + Sync + std::fmt::Debug {
    /// Get the policies explicitly mapped to a principal name.
    fn get_policies(&self, principal: &str) -> Option<BTreeSet<String>>;
}

/// In-memory policy store.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    policies: HashMap<String, BTreeSet<String>>,
}

impl InMemoryPolicyStore {
    /// Create a new in-memory policy store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a principal to a set of policies, merging with existing entries.
    pub fn add_principal<I, S>(&mut self, principal: String, policies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policies
            .entry(principal)
            .or_default()
            .extend(policies.into_iter().map(Into::into));
    }

    /// Create from a list of principal mappings.
    #[must_use]
    pub fn from_principals(principals: Vec<PrincipalPolicies>) -> Self {
        let mut store = Self::new();
        for entry in principals {
            store.add_principal(entry.principal, entry.policies);
        }
        store
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn get_policies(&self, principal: &str) -> Option<BTreeSet<String>> {
        self.policies.get(principal).cloned()
    }
}

/// File-based policy store.
///
/// Loads mappings from a file in the format:
/// ```text
/// alice@EXAMPLE.COM: default, ops
/// bob: default
/// ```
#[derive(Debug)]
pub struct FilePolicyStore {
    inner: InMemoryPolicyStore,
}

impl FilePolicyStore {
    /// Load a policy file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is malformed.
    pub fn load(path: &Path) -> AuthResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AuthError::Configuration(format!("Failed to read policy file: {e}"))
        })?;

        let mut inner = InMemoryPolicyStore::new();

        for (line_num, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Principals never contain ':', policies come after the last one.
            let Some((principal, policies)) = line.rsplit_once(':') else {
                return Err(AuthError::Configuration(format!(
                    "Invalid policy file format at line {}: expected 'principal: policy1,policy2'",
                    line_num + 1
                )));
            };

            let principal = principal.trim();
            let policies: Vec<&str> = policies
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();

            if principal.is_empty() || policies.is_empty() {
                return Err(AuthError::Configuration(format!(
                    "Invalid policy file format at line {}: principal and at least one policy required",
                    line_num + 1
                )));
            }

            inner.add_principal(principal.to_string(), policies);
        }

        Ok(Self { inner })
    }
}

impl PolicyStore for FilePolicyStore {
    fn get_policies(&self, principal: &str) -> Option<BTreeSet<String>> {
        self.inner.get_policies(principal)
    }
}

/// Create a policy store from configuration.
///
/// # Errors
///
/// Returns an error if the policy store cannot be created.
pub fn create_policy_store(config: &PolicyConfig) -> AuthResult<Arc<dyn PolicyStore>> {
    match config {
        PolicyConfig::Inline { principals } => Ok(Arc::new(
            InMemoryPolicyStore::from_principals(principals.clone()),
        )),
        PolicyConfig::File { file } => Ok(Arc::new(FilePolicyStore::load(file)?)),
    }
}

/// Read-only configuration consulted by the login path.
pub trait ConfigStore: Send + Sync + std::fmt::Debug {
    /// Service principal the backend accepts contexts for, if pinned.
    fn service_principal(&self) -> Option<String>;

    /// Policies for an authenticated principal.
    ///
    /// Lookup order: full principal name, realm-less short name (local realm
    /// only), default policies.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownPrincipal`] when no mapping applies and
    /// no default policy is configured.
    fn principal_policies(&self, principal: &AuthenticatedPrincipal)
        -> AuthResult<BTreeSet<String>>;

    /// Lease parameters for newly issued credentials.
    fn lease_defaults(&self) -> LeaseDefaults;
}

/// [`ConfigStore`] backed by a validated [`BackendConfig`].
#[derive(Debug)]
pub struct StaticConfigStore {
    service_principal: Option<String>,
    local_realm: Option<String>,
    policies: Arc<dyn PolicyStore>,
    default_policies: BTreeSet<String>,
    lease: LeaseDefaults,
}

impl StaticConfigStore {
    /// Build a store from backend configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the policy store
    /// cannot be loaded.
    pub fn from_config(config: &BackendConfig) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::Configuration(e.to_string()))?;

        Ok(Self {
            service_principal: config.service_principal(),
            local_realm: config.local_realm(),
            policies: create_policy_store(&config.policies)?,
            default_policies: config.default_policies.iter().cloned().collect(),
            lease: LeaseDefaults::from(&config.lease),
        })
    }

    /// Build a store from its parts.
    #[must_use]
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        default_policies: BTreeSet<String>,
        lease: LeaseDefaults,
    ) -> Self {
        Self {
            service_principal: None,
            local_realm: None,
            policies,
            default_policies,
            lease,
        }
    }

    /// Pin the service principal contexts are accepted for.
    ///
    /// Its realm becomes the local realm unless one was set explicitly.
    #[must_use]
    pub fn with_service_principal(mut self, service_principal: impl Into<String>) -> Self {
        let service_principal = service_principal.into();
        if self.local_realm.is_none() {
            self.local_realm = AuthenticatedPrincipal::new(service_principal.as_str())
                .realm()
                .map(str::to_string);
        }
        self.service_principal = Some(service_principal);
        self
    }

    /// Realm whose principals may match realm-less policy entries.
    #[must_use]
    pub fn with_local_realm(mut self, realm: impl Into<String>) -> Self {
        self.local_realm = Some(realm.into());
        self
    }
}

impl ConfigStore for StaticConfigStore {
    fn service_principal(&self) -> Option<String> {
        self.service_principal.clone()
    }

    fn principal_policies(
        &self,
        principal: &AuthenticatedPrincipal,
    ) -> AuthResult<BTreeSet<String>> {
        if let Some(policies) = self.policies.get_policies(principal.name()) {
            return Ok(policies);
        }

        // Foreign realms never inherit a local short name's policies.
        if principal.realm().is_some() && principal.realm() == self.local_realm.as_deref() {
            if let Some(policies) = self.policies.get_policies(principal.short_name()) {
                return Ok(policies);
            }
        }

        if self.default_policies.is_empty() {
            return Err(AuthError::UnknownPrincipal(principal.name().to_string()));
        }

        Ok(self.default_policies.clone())
    }

    fn lease_defaults(&self) -> LeaseDefaults {
        self.lease
    }
}

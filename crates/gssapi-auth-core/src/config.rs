//! Configuration types for the GSSAPI authentication backend.
//!
//! Configuration is loaded from YAML files and validated before use.
//!
//! ```yaml
//! backend:
//!   service_principal: "vault/vault.example.com@EXAMPLE.COM"
//!   keytab_path: "${VAULT_KEYTAB}"
//!   default_policies: [default]
//!   policies:
//!     principals:
//!       - principal: "alice@EXAMPLE.COM"
//!         policies: [default, ops]
//!   lease:
//!     ttl_secs: 3600
//!     max_ttl_secs: 86400
//! client:
//!   mount: gssapi
//!   service_class: vault
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::AuthenticatedPrincipal;
use crate::error::{ConfigError, ConfigResult};

/// Upper bound for `max_ttl_secs`: ten years.
pub const MAX_LEASE_SECS: u64 = 10 * 365 * 86_400;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Server-side (login acceptor) configuration.
    pub backend: BackendConfig,

    /// Client-side (context initiator) configuration.
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-side backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Service principal the backend accepts contexts for.
    ///
    /// When unset, the provider accepts for any principal in the keytab.
    /// Supports environment variable expansion: "${VAULT_SPN}"
    pub service_principal: Option<String>,

    /// Keytab holding the service principal's keys.
    /// Supports environment variable expansion: "${VAULT_KEYTAB}"
    pub keytab_path: Option<String>,

    /// Realm whose principals may match realm-less policy entries.
    ///
    /// Defaults to the realm of `service_principal`. Principals from any
    /// other realm only match entries naming them in full.
    pub realm: Option<String>,

    /// Principal to policy mapping.
    #[serde(default)]
    pub policies: PolicyConfig,

    /// Policies granted to authenticated principals with no explicit mapping.
    ///
    /// Empty means unmapped principals are rejected.
    #[serde(default)]
    pub default_policies: Vec<String>,

    /// Lease parameters for issued credentials.
    #[serde(default)]
    pub lease: LeaseConfig,

    /// Upper bound for a single accept call, in milliseconds.
    #[serde(default = "default_negotiation_timeout_ms")]
    pub negotiation_timeout_ms: u64,
}

/// Source of the principal to policy mapping.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PolicyConfig {
    /// Mapping listed directly in the configuration.
    Inline { principals: Vec<PrincipalPolicies> },
    /// Mapping loaded from a `principal: policy1,policy2` file.
    File { file: PathBuf },
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::Inline {
            principals: Vec::new(),
        }
    }
}

/// Policies granted to one principal.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrincipalPolicies {
    /// Full principal (`alice@EXAMPLE.COM`) or realm-less short name (`alice`).
    pub principal: String,
    /// Policy names.
    pub policies: Vec<String>,
}

/// Lease parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeaseConfig {
    /// Initial validity window in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum total lifetime in seconds, measured from issue.
    #[serde(default = "default_max_ttl_secs")]
    pub max_ttl_secs: u64,

    /// Validity window granted per renewal. Defaults to `ttl_secs`.
    pub renew_increment_secs: Option<u64>,
}

/// Client-side configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Mount point of the backend on the server (`auth/<mount>/login`).
    #[serde(default = "default_mount")]
    pub mount: String,

    /// Explicit target service principal; derived from the server address when unset.
    #[serde(alias = "servicename")]
    pub service_name: Option<String>,

    /// Service class used when deriving `<class>/<host>`.
    #[serde(default = "default_service_class")]
    pub service_class: String,

    /// Upper bound for context initiation, in milliseconds.
    #[serde(default = "default_negotiation_timeout_ms")]
    pub negotiation_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output logs in JSON format (for production).
    #[serde(default)]
    pub json: bool,
}

// Default value functions

fn default_negotiation_timeout_ms() -> u64 {
    10_000
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_max_ttl_secs() -> u64 {
    86_400
}

fn default_mount() -> String {
    "gssapi".to_string()
}

fn default_service_class() -> String {
    "vault".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_ttl_secs: default_max_ttl_secs(),
            renew_increment_secs: None,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mount: default_mount(),
            service_name: None,
            service_class: default_service_class(),
            negotiation_timeout_ms: default_negotiation_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            service_principal: None,
            keytab_path: None,
            realm: None,
            policies: PolicyConfig::default(),
            default_policies: Vec::new(),
            lease: LeaseConfig::default(),
            negotiation_timeout_ms: default_negotiation_timeout_ms(),
        }
    }
}

impl BackendConfig {
    /// Get the service principal with environment variables expanded.
    #[must_use]
    pub fn service_principal(&self) -> Option<String> {
        self.service_principal
            .as_deref()
            .map(expand_env_vars)
            .filter(|s| !s.is_empty())
    }

    /// Get the keytab path with environment variables expanded.
    #[must_use]
    pub fn keytab_path(&self) -> Option<PathBuf> {
        self.keytab_path
            .as_deref()
            .map(expand_env_vars)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    /// Realm for short-name policy matching: `realm` if set, otherwise the
    /// realm of the service principal.
    #[must_use]
    pub fn local_realm(&self) -> Option<String> {
        self.realm
            .as_deref()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .or_else(|| {
                let spn = AuthenticatedPrincipal::new(self.service_principal()?);
                spn.realm().map(str::to_string)
            })
    }

    /// Negotiation timeout as a `Duration`.
    #[must_use]
    pub fn negotiation_timeout(&self) -> Duration {
        Duration::from_millis(self.negotiation_timeout_ms)
    }

    /// Validate the backend configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if lease bounds are inconsistent, the timeout is
    /// zero, or a policy name is empty.
    pub fn validate(&self) -> ConfigResult<()> {
        self.lease.validate()?;

        if self.negotiation_timeout_ms == 0 {
            return Err(ConfigError::ZeroNegotiationTimeout);
        }

        if self.default_policies.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::EmptyPolicyName("default_policies".to_string()));
        }

        if let PolicyConfig::Inline { principals } = &self.policies {
            for entry in principals {
                if entry.policies.iter().any(|p| p.trim().is_empty()) {
                    return Err(ConfigError::EmptyPolicyName(entry.principal.clone()));
                }
            }
        }

        Ok(())
    }
}

impl LeaseConfig {
    /// Validate lease bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `ttl_secs` is zero
    /// - `ttl_secs` exceeds `max_ttl_secs`
    /// - `max_ttl_secs` exceeds [`MAX_LEASE_SECS`]
    /// - `renew_increment_secs` is set to zero
    pub fn validate(&self) -> ConfigResult<()> {
        if self.ttl_secs == 0 {
            return Err(ConfigError::ZeroTtl);
        }

        if self.max_ttl_secs > MAX_LEASE_SECS {
            return Err(ConfigError::MaxTtlTooLong {
                max_ttl_secs: self.max_ttl_secs,
                limit_secs: MAX_LEASE_SECS,
            });
        }

        if self.ttl_secs > self.max_ttl_secs {
            return Err(ConfigError::TtlExceedsMax {
                ttl_secs: self.ttl_secs,
                max_ttl_secs: self.max_ttl_secs,
            });
        }

        if self.renew_increment_secs == Some(0) {
            return Err(ConfigError::ZeroRenewIncrement);
        }

        Ok(())
    }
}

impl ClientConfig {
    /// Negotiation timeout as a `Duration`.
    #[must_use]
    pub fn negotiation_timeout(&self) -> Duration {
        Duration::from_millis(self.negotiation_timeout_ms)
    }
}

/// Expand environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of the environment variable `VAR_NAME`.
/// If the variable is not set, replaces with an empty string.
fn expand_env_vars(s: &str) -> String {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex");
    re.replace_all(s, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_default()
    })
    .to_string()
}

// Configuration loading and validation

impl AuthConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if
    /// validation fails.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Load configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation check fails.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.client.negotiation_timeout_ms == 0 {
            return Err(ConfigError::ZeroNegotiationTimeout);
        }
        self.backend.validate()
    }
}

//! Backend façade.
//!
//! [`GssapiBackend`] bundles the login and renewal handlers the host mounts
//! under `auth/<mount>/`, together with the path permissions and help text.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::auth::gssapi::{LoginAcceptor, SecurityContextProvider};
use crate::auth::policy::{ConfigStore, StaticConfigStore};
use crate::config::BackendConfig;
use crate::error::{AuthError, AuthResult};
use crate::handlers::{
    AuthHandler, ErrorResponse, LoginHandler, LoginRequest, LoginResponse, RenewHandler,
};
use crate::lease::{LeaseIssuer, RenewalHandler, SessionCredential, TokenIssuer};
use crate::metrics::AuthMetrics;

/// Help text shown by the host for this auth method.
pub const BACKEND_HELP: &str = "\
The GSSAPI auth backend authenticates clients holding Kerberos tickets.

Clients obtain a ticket-granting ticket with `kinit` and send the initial
security-context token for the server's service principal to the login
path. The backend validates it against its keytab, maps the client principal
to policies and issues a renewable token.";

/// Paths with special handling by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathsSpecial {
    /// Paths requiring root privileges.
    pub root: Vec<String>,
    /// Paths reachable without a token.
    pub unauthenticated: Vec<String>,
}

impl Default for PathsSpecial {
    fn default() -> Self {
        Self {
            root: vec!["config".to_string()],
            unauthenticated: vec!["login".to_string()],
        }
    }
}

/// The GSSAPI auth backend.
#[derive(Debug)]
pub struct GssapiBackend {
    login: LoginHandler,
    renew: RenewHandler,
    metrics: Arc<AuthMetrics>,
}

impl GssapiBackend {
    /// Assemble a backend from its collaborators.
    #[must_use]
    pub fn new(
        acceptor: LoginAcceptor,
        issuer: Arc<dyn LeaseIssuer>,
        config: Arc<dyn ConfigStore>,
        metrics: Arc<AuthMetrics>,
    ) -> Self {
        let renewal = RenewalHandler::new(issuer, config.lease_defaults().increment);
        Self {
            login: LoginHandler::new(acceptor, config, Arc::clone(&metrics)),
            renew: RenewHandler::new(renewal, Arc::clone(&metrics)),
            metrics,
        }
    }

    /// Build a backend from configuration, issuing tokens with [`TokenIssuer`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the policy store
    /// cannot be loaded, or a configured `keytab_path` is not the keytab the
    /// provider was built with (see `Krb5Provider::from_config`).
    pub fn from_config(
        provider: Arc<dyn SecurityContextProvider>,
        config: &BackendConfig,
    ) -> AuthResult<Self> {
        if let Some(keytab) = config.keytab_path() {
            if provider.keytab() != Some(keytab.as_path()) {
                return Err(AuthError::Configuration(format!(
                    "keytab_path '{}' is not applied to the {} provider",
                    keytab.display(),
                    provider.mechanism_name()
                )));
            }
        }

        let store = StaticConfigStore::from_config(config)?;
        let issuer: Arc<dyn LeaseIssuer> = Arc::new(TokenIssuer);
        let acceptor = LoginAcceptor::from_config(provider, Arc::clone(&issuer), config);

        info!(
            mechanism = acceptor.mechanism_name(),
            service_principal = ?store.service_principal(),
            "gssapi backend initialized"
        );

        Ok(Self::new(
            acceptor,
            issuer,
            Arc::new(store),
            Arc::new(AuthMetrics::new()),
        ))
    }

    /// Paths with special handling.
    #[must_use]
    pub fn paths_special(&self) -> PathsSpecial {
        PathsSpecial::default()
    }

    /// Help text for the auth method.
    #[must_use]
    pub fn help(&self) -> &'static str {
        BACKEND_HELP
    }

    /// Metrics recorded by this backend.
    #[must_use]
    pub fn metrics(&self) -> &Arc<AuthMetrics> {
        &self.metrics
    }

    /// Handle a login request.
    ///
    /// # Errors
    ///
    /// Returns the rendered [`AuthError`](crate::error::AuthError) on failure.
    pub async fn handle_login(&self, request: &LoginRequest) -> Result<LoginResponse, ErrorResponse> {
        self.login.handle(request).await
    }

    /// Handle a renewal of a credential issued by this backend.
    ///
    /// # Errors
    ///
    /// Returns the rendered [`AuthError`](crate::error::AuthError) on failure.
    pub async fn handle_renew(
        &self,
        credential: &SessionCredential,
    ) -> Result<LoginResponse, ErrorResponse> {
        self.renew.handle(credential).await
    }
}

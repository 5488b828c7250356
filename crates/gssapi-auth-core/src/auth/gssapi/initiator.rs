//! Client-side context initiation.
//!
//! Produces the token a client sends to the login path: resolve the target
//! service principal, open a context towards it, take the first outbound
//! token and base64-encode it. Nothing survives the call.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, info, instrument, warn};

use crate::auth::service_name::{ServicePrincipalName, DEFAULT_SERVICE_CLASS};
use crate::config::ClientConfig;
use crate::error::{AuthError, AuthResult};

use super::{run_bounded, ContextGuard, NegotiationStep, SecurityContextProvider};

/// Default bound for a single initiation.
const DEFAULT_NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side initiator of GSSAPI login tokens.
#[derive(Debug, Clone)]
pub struct ContextInitiator {
    provider: Arc<dyn SecurityContextProvider>,
    service_class: String,
    negotiation_timeout: Duration,
}

impl ContextInitiator {
    /// Create an initiator using the default service class and timeout.
    #[must_use]
    pub fn new(provider: Arc<dyn SecurityContextProvider>) -> Self {
        Self {
            provider,
            service_class: DEFAULT_SERVICE_CLASS.to_string(),
            negotiation_timeout: DEFAULT_NEGOTIATION_TIMEOUT,
        }
    }

    /// Create an initiator from client configuration.
    #[must_use]
    pub fn from_config(provider: Arc<dyn SecurityContextProvider>, config: &ClientConfig) -> Self {
        Self {
            provider,
            service_class: config.service_class.clone(),
            negotiation_timeout: config.negotiation_timeout(),
        }
    }

    /// Override the negotiation timeout.
    #[must_use]
    pub fn with_timeout(mut self, negotiation_timeout: Duration) -> Self {
        self.negotiation_timeout = negotiation_timeout;
        self
    }

    /// Produce a base64 login token for the service behind `endpoint`.
    ///
    /// `service_hint`, when non-blank, names the target principal verbatim.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidEndpoint`] if no hint is given and `endpoint` has no host
    /// - [`AuthError::ProviderUnavailable`] if local credentials are missing
    /// - [`AuthError::InvalidPrincipalName`] if the name cannot be imported as requested
    /// - [`AuthError::IncompleteNegotiation`] if one round does not complete the context
    /// - [`AuthError::NegotiationTimeout`] if the provider does not answer in time
    #[instrument(skip(self), fields(mechanism = self.provider.mechanism_name()))]
    pub async fn authenticate(
        &self,
        service_hint: Option<&str>,
        endpoint: &str,
    ) -> AuthResult<String> {
        let spn = ServicePrincipalName::resolve(service_hint, endpoint, &self.service_class)?;
        let provider = Arc::clone(&self.provider);
        let target = spn.to_string();

        let token =
            run_bounded(self.negotiation_timeout, move || initiate(provider.as_ref(), &target))
                .await?;

        info!(service_name = %spn, token_len = token.len(), "security context initiated");
        Ok(BASE64.encode(token))
    }
}

/// One initiation round. Runs on a blocking worker.
fn initiate(provider: &dyn SecurityContextProvider, target: &str) -> AuthResult<Vec<u8>> {
    let imported = provider.import_name(target)?;
    if imported != target {
        warn!(requested = %target, imported = %imported, "provider altered service name");
        return Err(AuthError::InvalidPrincipalName {
            requested: target.to_string(),
            reason: format!("provider rendered the name as '{imported}'"),
        });
    }

    let mut context = ContextGuard::new(provider.initiate_context(target)?);
    debug!(target, "initiating security context");

    match context.step(None)? {
        NegotiationStep::Complete(token) if token.is_empty() => Err(
            AuthError::IncompleteNegotiation("provider produced no initial token".to_string()),
        ),
        NegotiationStep::Complete(token) => Ok(token),
        NegotiationStep::Continue(_) => Err(AuthError::IncompleteNegotiation(
            "initiator requires additional rounds".to_string(),
        )),
    }
}

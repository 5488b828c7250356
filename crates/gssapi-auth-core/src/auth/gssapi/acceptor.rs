//! Server-side login.
//!
//! The login path is single-shot: the client's first token must complete the
//! context. A completed context yields the peer principal, which is mapped to
//! policies and turned into a fresh session credential.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, info, instrument, warn};

use crate::auth::policy::ConfigStore;
use crate::auth::principal::AuthenticatedPrincipal;
use crate::config::BackendConfig;
use crate::error::{AuthError, AuthResult};
use crate::lease::{CredentialMetadata, Lease, LeaseIssuer, SessionCredential, METADATA_PRINCIPAL};

use super::{run_bounded, ContextGuard, NegotiationStep, SecurityContextProvider};

/// Accepts GSSAPI login tokens and issues session credentials.
#[derive(Debug, Clone)]
pub struct LoginAcceptor {
    provider: Arc<dyn SecurityContextProvider>,
    issuer: Arc<dyn LeaseIssuer>,
    negotiation_timeout: Duration,
}

impl LoginAcceptor {
    /// Create a new login acceptor.
    #[must_use]
    pub fn new(
        provider: Arc<dyn SecurityContextProvider>,
        issuer: Arc<dyn LeaseIssuer>,
        negotiation_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            issuer,
            negotiation_timeout,
        }
    }

    /// Create a login acceptor bounded by the backend's negotiation timeout.
    #[must_use]
    pub fn from_config(
        provider: Arc<dyn SecurityContextProvider>,
        issuer: Arc<dyn LeaseIssuer>,
        config: &BackendConfig,
    ) -> Self {
        Self::new(provider, issuer, config.negotiation_timeout())
    }

    /// Get the mechanism name of the underlying provider.
    #[must_use]
    pub fn mechanism_name(&self) -> &'static str {
        self.provider.mechanism_name()
    }

    /// Validate a base64 login token and issue a credential.
    ///
    /// Every successful call issues a new credential, even for the same
    /// principal.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MalformedToken`] if the token is not base64 or is empty
    /// - [`AuthError::NegotiationRejected`] if the provider rejects the token
    /// - [`AuthError::IncompleteNegotiation`] if the token does not complete the context
    /// - [`AuthError::UnknownPrincipal`] if no policy applies to the principal
    /// - [`AuthError::NegotiationTimeout`] if the provider does not answer in time
    #[instrument(skip_all, fields(mechanism = self.provider.mechanism_name()))]
    pub async fn login(
        &self,
        config: &dyn ConfigStore,
        token: &str,
    ) -> AuthResult<SessionCredential> {
        let token = decode_token(token)?;
        debug!(token_len = token.len(), "login attempt");

        let provider = Arc::clone(&self.provider);
        let service_principal = config.service_principal();
        let peer = run_bounded(self.negotiation_timeout, move || {
            accept(provider.as_ref(), service_principal.as_deref(), &token)
        })
        .await?;

        let principal = AuthenticatedPrincipal::new(peer);
        let policies = config.principal_policies(&principal).map_err(|e| {
            warn!(principal = %principal, error = %e, "no policies for principal");
            e
        })?;

        let mut metadata = CredentialMetadata::new();
        metadata.insert(METADATA_PRINCIPAL.to_string(), principal.name().to_string());
        let lease = Lease::new(&config.lease_defaults(), SystemTime::now());

        let credential = self.issuer.issue(policies, metadata, lease)?;
        info!(
            principal = %principal,
            policies = ?credential.policies,
            ttl_secs = credential.lease.ttl.as_secs(),
            "login successful"
        );
        Ok(credential)
    }
}

/// Decode the transport encoding of a login token.
fn decode_token(token: &str) -> AuthResult<Vec<u8>> {
    let decoded = BASE64
        .decode(token.trim())
        .map_err(|e| AuthError::MalformedToken(e.to_string()))?;

    if decoded.is_empty() {
        return Err(AuthError::MalformedToken("empty token".to_string()));
    }

    Ok(decoded)
}

/// One acceptance round. Runs on a blocking worker.
fn accept(
    provider: &dyn SecurityContextProvider,
    service_principal: Option<&str>,
    token: &[u8],
) -> AuthResult<String> {
    let mut context = ContextGuard::new(provider.accept_context(service_principal)?);

    match context.step(Some(token)) {
        Ok(NegotiationStep::Complete(_)) => {}
        Ok(NegotiationStep::Continue(_)) => {
            warn!("login token did not complete the security context");
            return Err(AuthError::IncompleteNegotiation(
                "acceptor requires additional rounds".to_string(),
            ));
        }
        Err(e) => {
            warn!(error = %e, "security context rejected");
            return Err(e);
        }
    }

    let peer = context.peer_name()?;
    if peer.trim().is_empty() {
        return Err(AuthError::NegotiationRejected(
            "provider reported no peer name".to_string(),
        ));
    }

    Ok(peer)
}

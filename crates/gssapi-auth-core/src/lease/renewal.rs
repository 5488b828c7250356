//! Lease renewal for previously issued credentials.
//!
//! Renewal needs no fresh negotiation. A renewable credential gets a new
//! validity window of `increment`, clamped so the total lifetime never
//! passes `max_ttl`.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};

use super::{Lease, LeaseIssuer, SessionCredential};

/// Extends leases of issued credentials.
#[derive(Debug, Clone)]
pub struct RenewalHandler {
    issuer: Arc<dyn LeaseIssuer>,
    increment: Duration,
}

impl RenewalHandler {
    /// Create a renewal handler granting `increment` per renewal.
    #[must_use]
    pub fn new(issuer: Arc<dyn LeaseIssuer>, increment: Duration) -> Self {
        Self { issuer, increment }
    }

    /// Renew `credential` as of now.
    ///
    /// # Errors
    ///
    /// See [`RenewalHandler::renew_at`].
    pub fn renew(&self, credential: &SessionCredential) -> AuthResult<SessionCredential> {
        self.renew_at(credential, SystemTime::now())
    }

    /// Renew `credential` as of `now`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotRenewable`] if the lease is not renewable
    /// - [`AuthError::LeaseExpired`] if the lifetime already reached `max_ttl`
    /// - any error from the issuer
    pub fn renew_at(
        &self,
        credential: &SessionCredential,
        now: SystemTime,
    ) -> AuthResult<SessionCredential> {
        let lease = &credential.lease;

        if !lease.renewable {
            warn!(principal = ?credential.principal(), "renewal refused: lease not renewable");
            return Err(AuthError::NotRenewable);
        }

        let elapsed = lease.elapsed_at(now);
        if elapsed >= lease.max_ttl {
            warn!(
                principal = ?credential.principal(),
                elapsed_secs = elapsed.as_secs(),
                max_ttl_secs = lease.max_ttl.as_secs(),
                "renewal refused: lease reached max ttl"
            );
            return Err(AuthError::LeaseExpired {
                elapsed_secs: elapsed.as_secs(),
                max_ttl_secs: lease.max_ttl.as_secs(),
            });
        }

        let ttl = self.increment.min(lease.max_ttl - elapsed);
        let renewed = Lease {
            ttl,
            renewed_at: now,
            ..lease.clone()
        };

        debug!(
            principal = ?credential.principal(),
            ttl_secs = ttl.as_secs(),
            "lease renewed"
        );

        self.issuer.renew(credential, renewed)
    }
}

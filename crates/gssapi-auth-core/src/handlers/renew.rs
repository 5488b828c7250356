//! Renewal handler.

use std::sync::Arc;

use async_trait::async_trait;

use crate::lease::{RenewalHandler, SessionCredential};
use crate::metrics::AuthMetrics;

use super::{AuthHandler, ErrorResponse, LoginResponse};

/// Serves lease renewal for credentials issued by the login path.
#[derive(Debug)]
pub struct RenewHandler {
    renewal: RenewalHandler,
    metrics: Arc<AuthMetrics>,
}

impl RenewHandler {
    /// Create a new renew handler.
    #[must_use]
    pub fn new(renewal: RenewalHandler, metrics: Arc<AuthMetrics>) -> Self {
        Self { renewal, metrics }
    }
}

#[async_trait]
impl AuthHandler for RenewHandler {
    type Request = SessionCredential;
    type Response = LoginResponse;

    async fn handle(&self, credential: &SessionCredential) -> Result<LoginResponse, ErrorResponse> {
        let result = self.renewal.renew(credential);
        self.metrics
            .record_renewal(result.as_ref().err().map(|e| e.kind()));

        Ok(LoginResponse::from(&result?))
    }
}

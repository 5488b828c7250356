//! Login path handler.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::auth::gssapi::LoginAcceptor;
use crate::auth::policy::ConfigStore;
use crate::metrics::AuthMetrics;

use super::{AuthHandler, ErrorResponse, LoginRequest, LoginResponse};

/// Mount point used when the client does not name one.
pub const DEFAULT_MOUNT: &str = "gssapi";

/// Login path for a backend mounted at `mount`: `auth/<mount>/login`.
#[must_use]
pub fn login_path(mount: Option<&str>) -> String {
    let mount = mount
        .map(|m| m.trim().trim_matches('/'))
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MOUNT);
    format!("auth/{mount}/login")
}

/// Serves the unauthenticated login path.
#[derive(Debug)]
pub struct LoginHandler {
    acceptor: LoginAcceptor,
    config: Arc<dyn ConfigStore>,
    metrics: Arc<AuthMetrics>,
}

impl LoginHandler {
    /// Create a new login handler.
    #[must_use]
    pub fn new(
        acceptor: LoginAcceptor,
        config: Arc<dyn ConfigStore>,
        metrics: Arc<AuthMetrics>,
    ) -> Self {
        Self {
            acceptor,
            config,
            metrics,
        }
    }
}

/// Closes the in-flight gauge even when the request future is dropped.
struct InFlight<'a> {
    metrics: &'a AuthMetrics,
    started: Instant,
    outcome: Option<Option<&'static str>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let outcome = self.outcome.unwrap_or(Some("cancelled"));
        self.metrics
            .login_finished(self.started.elapsed().as_secs_f64(), outcome);
    }
}

#[async_trait]
impl AuthHandler for LoginHandler {
    type Request = LoginRequest;
    type Response = LoginResponse;

    async fn handle(&self, request: &LoginRequest) -> Result<LoginResponse, ErrorResponse> {
        self.metrics.login_started();
        let mut in_flight = InFlight {
            metrics: &self.metrics,
            started: Instant::now(),
            outcome: None,
        };

        let result = self.acceptor.login(self.config.as_ref(), &request.token).await;
        in_flight.outcome = Some(result.as_ref().err().map(|e| e.kind()));

        let credential = result?;
        debug!(principal = ?credential.principal(), "rendering login response");
        Ok(LoginResponse::from(&credential))
    }
}

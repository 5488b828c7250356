//! Request handlers for the backend's paths.
//!
//! Each handler serves one path, runs the matching core operation and renders
//! the result in the host's JSON shapes.

pub mod login;
pub mod renew;

pub use login::{login_path, LoginHandler, DEFAULT_MOUNT};
pub use renew::RenewHandler;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::lease::SessionCredential;

/// Trait for path handlers.
#[async_trait]
pub trait AuthHandler: Send + Sync {
    /// Request body accepted by the path.
    type Request: Send + Sync;
    /// Successful response body.
    type Response: Send;

    /// Handle a request and produce a response body or a rendered error.
    async fn handle(&self, request: &Self::Request) -> Result<Self::Response, ErrorResponse>;
}

/// Body of a login request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Base64-encoded initial security-context token.
    #[serde(alias = "GssAPIToken")]
    pub token: String,
}

impl LoginRequest {
    /// Wrap a base64 token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

/// Credential view returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthView {
    /// Opaque session identifier.
    pub client_token: String,
    /// Granted policies, sorted.
    pub policies: Vec<String>,
    /// Credential metadata.
    pub metadata: BTreeMap<String, String>,
    /// Current validity window in seconds.
    pub lease_duration: u64,
    /// Whether the lease may be renewed.
    pub renewable: bool,
}

impl From<&SessionCredential> for AuthView {
    fn from(credential: &SessionCredential) -> Self {
        Self {
            client_token: credential.client_token.clone(),
            policies: credential.policies.iter().cloned().collect(),
            metadata: credential.metadata.clone(),
            lease_duration: credential.lease.ttl.as_secs(),
            renewable: credential.lease.renewable,
        }
    }
}

/// Successful login or renewal response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// The issued or renewed credential.
    pub auth: AuthView,
}

impl From<&SessionCredential> for LoginResponse {
    fn from(credential: &SessionCredential) -> Self {
        Self {
            auth: AuthView::from(credential),
        }
    }
}

/// Error body: `{ "error": <kind>, "message": <text> }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable snake_case error kind.
    pub error: String,
    /// Human-readable detail.
    pub message: String,
}

impl From<&AuthError> for ErrorResponse {
    fn from(err: &AuthError) -> Self {
        Self {
            error: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        Self::from(&err)
    }
}

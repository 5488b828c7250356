//! GSSAPI Auth Backend Core Library
//!
//! This library provides the core of a GSSAPI (Kerberos) auth method for a
//! secrets-management server. A client proves its Kerberos identity with a
//! single security-context token; the backend validates it, maps the
//! principal to policies and issues a renewable, time-bounded credential.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`auth`] - Security-context negotiation, service names, policy mapping
//! - [`lease`] - Session credentials, leases and renewal
//! - [`handlers`] - Login and renewal path handlers
//! - [`backend`] - The backend façade mounted by the host
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Domain-specific error types
//! - [`metrics`] - Prometheus metrics collection
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gssapi_auth_core::{AuthConfig, GssapiBackend, Krb5Provider, LoginRequest};
//!
//! let config = AuthConfig::from_file("gssapi.yaml")?;
//! // Selects the configured keytab; build it before the runtime starts.
//! let provider = Arc::new(Krb5Provider::from_config(&config.backend));
//! let backend = GssapiBackend::from_config(provider, &config.backend)?;
//!
//! let response = backend.handle_login(&LoginRequest::new(token)).await;
//! ```

#![forbid(unsafe_code)]

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lease;
pub mod metrics;

/// Test utilities for integration testing.
///
/// This module is only available when compiling tests or when the `testing` feature is enabled.
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
#[cfg(feature = "gssapi")]
pub use auth::Krb5Provider;
pub use auth::{
    AuthenticatedPrincipal, ConfigStore, ContextInitiator, LoginAcceptor, SecurityContextProvider,
    StaticConfigStore,
};
pub use backend::{GssapiBackend, PathsSpecial};
pub use config::{AuthConfig, BackendConfig, ClientConfig};
pub use error::{AuthError, AuthResult, ConfigError, ConfigResult};
pub use handlers::{login_path, ErrorResponse, LoginRequest, LoginResponse};
pub use lease::{Lease, LeaseIssuer, RenewalHandler, SessionCredential, TokenIssuer};
pub use metrics::AuthMetrics;

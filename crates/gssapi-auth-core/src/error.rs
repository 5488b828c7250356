//! Domain error types for the GSSAPI authentication backend.
//!
//! Uses `thiserror` for ergonomic error definitions with proper context.

use std::time::Duration;

use thiserror::Error;

/// Errors related to configuration parsing and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Lease TTL must be non-zero.
    #[error("lease ttl must be greater than zero")]
    ZeroTtl,

    /// Lease TTL may not exceed the maximum lifetime.
    #[error("lease ttl ({ttl_secs}s) must not exceed max_ttl ({max_ttl_secs}s)")]
    TtlExceedsMax { ttl_secs: u64, max_ttl_secs: u64 },

    /// Maximum lifetime is capped.
    #[error("lease max_ttl ({max_ttl_secs}s) must not exceed {limit_secs}s")]
    MaxTtlTooLong { max_ttl_secs: u64, limit_secs: u64 },

    /// Renewal increment, when set, must be non-zero.
    #[error("renew_increment must be greater than zero")]
    ZeroRenewIncrement,

    /// Negotiation timeout must be non-zero.
    #[error("negotiation_timeout_ms must be greater than zero")]
    ZeroNegotiationTimeout,

    /// A policy list contained an empty name.
    #[error("empty policy name configured for '{0}'")]
    EmptyPolicyName(String),

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Errors surfaced by the login, initiation and renewal paths.
///
/// Every variant is request-scoped and returned verbatim to the caller.
/// Nothing here is retried by the core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The transport endpoint has no usable host component.
    #[error("invalid endpoint '{0}': cannot determine host")]
    InvalidEndpoint(String),

    /// The security-context library or local credentials are unavailable.
    #[error("security-context provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The principal name could not be imported, or was echoed back altered.
    #[error("invalid principal name '{requested}': {reason}")]
    InvalidPrincipalName { requested: String, reason: String },

    /// The provider wants more rounds than the single-shot login allows.
    #[error("negotiation incomplete: {0}")]
    IncompleteNegotiation(String),

    /// The login token is not valid base64 or is empty.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The accepting provider rejected the token.
    #[error("negotiation rejected: {0}")]
    NegotiationRejected(String),

    /// No policy mapping and no default policy for the principal.
    #[error("no policies mapped for principal '{0}'")]
    UnknownPrincipal(String),

    /// The credential's lease is not renewable.
    #[error("credential is not renewable")]
    NotRenewable,

    /// The credential has reached its maximum lifetime.
    #[error("lease expired: elapsed {elapsed_secs}s reached max_ttl {max_ttl_secs}s")]
    LeaseExpired { elapsed_secs: u64, max_ttl_secs: u64 },

    /// The provider did not finish within the negotiation timeout.
    #[error("negotiation timed out after {0:?}")]
    NegotiationTimeout(Duration),

    /// Backend setup error (policy store, provider configuration).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// Stable snake_case identifier for the error kind.
    ///
    /// Used in structured error responses and as a metrics label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint(_) => "invalid_endpoint",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::InvalidPrincipalName { .. } => "invalid_principal_name",
            Self::IncompleteNegotiation(_) => "incomplete_negotiation",
            Self::MalformedToken(_) => "malformed_token",
            Self::NegotiationRejected(_) => "negotiation_rejected",
            Self::UnknownPrincipal(_) => "unknown_principal",
            Self::NotRenewable => "not_renewable",
            Self::LeaseExpired { .. } => "lease_expired",
            Self::NegotiationTimeout(_) => "negotiation_timeout",
            Self::Configuration(_) => "configuration",
        }
    }
}

/// Result type alias for authentication operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

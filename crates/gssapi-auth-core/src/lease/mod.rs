//! Session credentials and their leases.
//!
//! A [`SessionCredential`] is issued once per successful negotiation and
//! carries an opaque client token, the granted policies, the negotiated
//! principal and a [`Lease`]. Renewal (see [`renewal`]) only ever replaces the
//! lease; policies and metadata are fixed at issue time.

pub mod renewal;

pub use renewal::RenewalHandler;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::time::{Duration, SystemTime};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::LeaseConfig;
use crate::error::AuthResult;

/// Metadata key holding the authenticated principal.
pub const METADATA_PRINCIPAL: &str = "principal";

/// Prefix of client tokens minted by [`TokenIssuer`].
pub const CLIENT_TOKEN_PREFIX: &str = "s.";

/// Random bytes per client token.
const CLIENT_TOKEN_BYTES: usize = 24;

/// Free-form credential metadata.
pub type CredentialMetadata = BTreeMap<String, String>;

/// Lease parameters taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseDefaults {
    /// Initial validity window.
    pub ttl: Duration,
    /// Maximum total lifetime.
    pub max_ttl: Duration,
    /// Validity window granted per renewal.
    pub increment: Duration,
}

impl From<&LeaseConfig> for LeaseDefaults {
    fn from(config: &LeaseConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.ttl_secs),
            max_ttl: Duration::from_secs(config.max_ttl_secs),
            increment: Duration::from_secs(config.renew_increment_secs.unwrap_or(config.ttl_secs)),
        }
    }
}

/// Time-bounded validity window of a credential.
///
/// `ttl` is measured from `renewed_at`, `max_ttl` from `issued_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Current validity window.
    pub ttl: Duration,
    /// Maximum total lifetime.
    pub max_ttl: Duration,
    /// Whether the lease may be extended.
    pub renewable: bool,
    /// When the credential was issued.
    pub issued_at: SystemTime,
    /// When the lease was last issued or renewed.
    pub renewed_at: SystemTime,
}

impl Lease {
    /// Create a renewable lease starting at `now`.
    #[must_use]
    pub fn new(defaults: &LeaseDefaults, now: SystemTime) -> Self {
        Self {
            ttl: defaults.ttl.min(defaults.max_ttl),
            max_ttl: defaults.max_ttl,
            renewable: true,
            issued_at: now,
            renewed_at: now,
        }
    }

    /// Lifetime consumed at `now`. Clock skew backwards counts as zero.
    #[must_use]
    pub fn elapsed_at(&self, now: SystemTime) -> Duration {
        now.duration_since(self.issued_at).unwrap_or_default()
    }

    /// When the current validity window ends, or `None` if it lies beyond
    /// what the platform clock can represent.
    #[must_use]
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.renewed_at.checked_add(self.ttl)
    }
}

/// Credential issued after a completed negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    /// Opaque session identifier.
    pub client_token: String,
    /// Granted policies.
    pub policies: BTreeSet<String>,
    /// Validity window.
    pub lease: Lease,
    /// Credential metadata; always carries [`METADATA_PRINCIPAL`].
    pub metadata: CredentialMetadata,
}

impl SessionCredential {
    /// The principal the credential was issued to.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.metadata.get(METADATA_PRINCIPAL).map(String::as_str)
    }
}

/// Issues and re-issues session credentials.
///
/// Persistence and revocation belong to the host's lease manager; an issuer
/// only mints the credential view.
pub trait LeaseIssuer: Send + Sync + Debug {
    /// Mint a new credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the issuer cannot mint a credential.
    fn issue(
        &self,
        policies: BTreeSet<String>,
        metadata: CredentialMetadata,
        lease: Lease,
    ) -> AuthResult<SessionCredential>;

    /// Re-issue `credential` with an extended lease.
    ///
    /// # Errors
    ///
    /// Returns an error if the issuer refuses the renewal.
    fn renew(&self, credential: &SessionCredential, lease: Lease) -> AuthResult<SessionCredential> {
        Ok(SessionCredential {
            lease,
            ..credential.clone()
        })
    }
}

/// Issuer minting random opaque client tokens.
#[derive(Debug, Default)]
pub struct TokenIssuer;

impl TokenIssuer {
    fn generate_token() -> String {
        let bytes: [u8; CLIENT_TOKEN_BYTES] = rand::thread_rng().gen();
        format!("{CLIENT_TOKEN_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
    }
}

impl LeaseIssuer for TokenIssuer {
    fn issue(
        &self,
        policies: BTreeSet<String>,
        metadata: CredentialMetadata,
        lease: Lease,
    ) -> AuthResult<SessionCredential> {
        Ok(SessionCredential {
            client_token: Self::generate_token(),
            policies,
            lease,
            metadata,
        })
    }
}

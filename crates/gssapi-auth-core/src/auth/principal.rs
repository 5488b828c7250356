//! Principal representation for negotiated identities.
//!
//! An [`AuthenticatedPrincipal`] is the peer name reported by the accepting
//! security-context provider once negotiation completes. The core does not
//! validate it further; the provider is the trust anchor.
//!
//! # Example
//!
//! ```
//! use gssapi_auth_core::auth::AuthenticatedPrincipal;
//!
//! let principal = AuthenticatedPrincipal::new("alice/admin@EXAMPLE.COM");
//! assert_eq!(principal.short_name(), "alice/admin");
//! assert_eq!(principal.realm(), Some("EXAMPLE.COM"));
//! ```

use std::fmt;

/// Identity asserted by the client and verified by the accepting provider.
///
/// Kerberos principals have the form `primary[/instance]@REALM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthenticatedPrincipal {
    name: String,
}

impl AuthenticatedPrincipal {
    /// Wrap a provider-reported peer name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The full principal name, as reported by the provider.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The realm component, if present.
    #[must_use]
    pub fn realm(&self) -> Option<&str> {
        self.name
            .rsplit_once('@')
            .map(|(_, realm)| realm)
            .filter(|realm| !realm.is_empty())
    }

    /// The principal without its realm.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.name
            .rsplit_once('@')
            .map_or(self.name.as_str(), |(short, _)| short)
    }
}

impl fmt::Display for AuthenticatedPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

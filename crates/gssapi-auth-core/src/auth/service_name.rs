//! Service principal name resolution.
//!
//! The initiator targets `<service-class>/<host>`. An explicit name wins;
//! otherwise the host is taken from the server address the client talks to.

use std::fmt;

use tracing::{debug, info};
use url::Url;

use crate::error::{AuthError, AuthResult};

/// Service class used when deriving a name from the server address.
pub const DEFAULT_SERVICE_CLASS: &str = "vault";

/// Target service principal for one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServicePrincipalName(String);

impl ServicePrincipalName {
    /// Resolve the target name.
    ///
    /// A non-blank `hint` is used verbatim. Otherwise the name is
    /// `<service_class>/<host>` with the host taken from `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEndpoint`] when no hint is given and the
    /// endpoint has no parsable host.
    pub fn resolve(hint: Option<&str>, endpoint: &str, service_class: &str) -> AuthResult<Self> {
        if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
            return Ok(Self(hint.to_string()));
        }

        let host = endpoint_host(endpoint)?;
        let name = format!("{service_class}/{host}");
        info!(service_name = %name, "auto-generated service name");
        Ok(Self(name))
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServicePrincipalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the host component of a server address.
///
/// Accepts any URL with an authority and bare `host[:port]`, which is read as
/// `http://host[:port]`. IPv6 literals lose their brackets and a trailing
/// root dot is dropped.
fn endpoint_host(endpoint: &str) -> AuthResult<String> {
    let invalid = || AuthError::InvalidEndpoint(endpoint.to_string());

    let trimmed = endpoint.trim();
    let url = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("http://{trimmed}"))
    }
    .map_err(|e| {
        debug!(endpoint, error = %e, "unparsable endpoint");
        invalid()
    })?;

    let host = url
        .host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
        .map(|h| h.strip_suffix('.').unwrap_or(h))
        .filter(|h| !h.is_empty())
        .ok_or_else(invalid)?;

    Ok(host.to_string())
}

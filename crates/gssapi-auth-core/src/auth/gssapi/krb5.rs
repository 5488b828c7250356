//! Kerberos provider backed by the system GSSAPI library.
//!
//! Only compiled with the `gssapi` feature. The initiator uses the caller's
//! credential cache (`kinit`); the acceptor reads the service keys from the
//! keytab named by `KRB5_KTNAME`, which [`Krb5Provider::with_keytab`] sets.
//!
//! `KRB5_KTNAME` is process environment. Build the provider before starting
//! the async runtime or any other thread.

use std::path::{Path, PathBuf};

use libgssapi::context::{ClientCtx, CtxFlags, SecurityContext as _, ServerCtx};
use libgssapi::credential::{Cred, CredUsage};
use libgssapi::name::Name;
use libgssapi::oid::{OidSet, GSS_MECH_KRB5, GSS_NT_KRB5_PRINCIPAL};
use tracing::{debug, info};

use crate::config::BackendConfig;
use crate::error::{AuthError, AuthResult};

use super::{NegotiationStep, SecurityContext, SecurityContextProvider};

/// Environment variable the Kerberos library reads the acceptor keytab from.
const KEYTAB_ENV: &str = "KRB5_KTNAME";

/// [`SecurityContextProvider`] for the Kerberos v5 mechanism.
#[derive(Debug, Clone, Default)]
pub struct Krb5Provider {
    keytab: Option<PathBuf>,
}

impl Krb5Provider {
    /// Create a provider using the process's default credential cache and keytab.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider whose acceptor reads keys from `keytab`.
    ///
    /// The keytab is process-wide state in the Kerberos library; call this
    /// once at startup, before any other thread exists.
    #[must_use]
    pub fn with_keytab(keytab: &Path) -> Self {
        info!(keytab = %keytab.display(), "using acceptor keytab");
        std::env::set_var(KEYTAB_ENV, keytab);
        Self {
            keytab: Some(keytab.to_path_buf()),
        }
    }

    /// Create a provider for the backend configuration, selecting its
    /// `keytab_path` when one is configured.
    ///
    /// Same threading rule as [`Krb5Provider::with_keytab`].
    #[must_use]
    pub fn from_config(config: &BackendConfig) -> Self {
        match config.keytab_path() {
            Some(keytab) => Self::with_keytab(&keytab),
            None => Self::new(),
        }
    }
}

fn import(name: &str) -> AuthResult<Name> {
    Name::new(name.as_bytes(), Some(&GSS_NT_KRB5_PRINCIPAL)).map_err(|e| {
        AuthError::InvalidPrincipalName {
            requested: name.to_string(),
            reason: e.to_string(),
        }
    })
}

fn krb5_mechs() -> AuthResult<OidSet> {
    let mut mechs =
        OidSet::new().map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;
    mechs
        .add(&GSS_MECH_KRB5)
        .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;
    Ok(mechs)
}

impl SecurityContextProvider for Krb5Provider {
    fn mechanism_name(&self) -> &'static str {
        "KRB5"
    }

    fn import_name(&self, name: &str) -> AuthResult<String> {
        Ok(import(name)?.to_string())
    }

    fn initiate_context(&self, target: &str) -> AuthResult<Box<dyn SecurityContext>> {
        let target = import(target)?;
        let mechs = krb5_mechs()?;
        let cred = Cred::acquire(None, None, CredUsage::Initiate, Some(&mechs)).map_err(|e| {
            AuthError::ProviderUnavailable(format!("no initiator credentials: {e}"))
        })?;

        debug!("acquired initiator credentials");
        Ok(Box::new(Krb5Context::Client(Some(ClientCtx::new(
            Some(cred),
            target,
            CtxFlags::empty(),
            Some(&GSS_MECH_KRB5),
        )))))
    }

    fn keytab(&self) -> Option<&Path> {
        self.keytab.as_deref()
    }

    fn accept_context(
        &self,
        service_principal: Option<&str>,
    ) -> AuthResult<Box<dyn SecurityContext>> {
        let name = service_principal.map(import).transpose()?;
        let mechs = krb5_mechs()?;
        let cred = Cred::acquire(name.as_ref(), None, CredUsage::Accept, Some(&mechs))
            .map_err(|e| {
                AuthError::ProviderUnavailable(format!("no acceptor credentials: {e}"))
            })?;

        debug!(service_principal, "acquired acceptor credentials");
        Ok(Box::new(Krb5Context::Server(Some(ServerCtx::new(Some(
            cred,
        ))))))
    }
}

/// A Kerberos context; `None` once released.
enum Krb5Context {
    Client(Option<ClientCtx>),
    Server(Option<ServerCtx>),
}

fn released() -> AuthError {
    AuthError::ProviderUnavailable("security context already released".to_string())
}

impl SecurityContext for Krb5Context {
    fn step(&mut self, input: Option<&[u8]>) -> AuthResult<NegotiationStep> {
        match self {
            Self::Client(ctx) => {
                let ctx = ctx.as_mut().ok_or_else(released)?;
                let token = ctx
                    .step(input, None)
                    .map_err(|e| AuthError::NegotiationRejected(e.to_string()))?;
                let token = token.map(|buf| buf.to_vec()).unwrap_or_default();
                Ok(if ctx.is_complete() {
                    NegotiationStep::Complete(token)
                } else {
                    NegotiationStep::Continue(token)
                })
            }
            Self::Server(ctx) => {
                let ctx = ctx.as_mut().ok_or_else(released)?;
                let input = input.ok_or_else(|| {
                    AuthError::MalformedToken("acceptor requires an input token".to_string())
                })?;
                let token = ctx
                    .step(input)
                    .map_err(|e| AuthError::NegotiationRejected(e.to_string()))?;
                let token = token.map(|buf| buf.to_vec()).unwrap_or_default();
                Ok(if ctx.is_complete() {
                    NegotiationStep::Complete(token)
                } else {
                    NegotiationStep::Continue(token)
                })
            }
        }
    }

    fn peer_name(&mut self) -> AuthResult<String> {
        let name = match self {
            Self::Client(ctx) => ctx.as_mut().ok_or_else(released)?.target_name(),
            Self::Server(ctx) => ctx.as_mut().ok_or_else(released)?.source_name(),
        };
        name.map(|n| n.to_string())
            .map_err(|e| AuthError::IncompleteNegotiation(e.to_string()))
    }

    fn release(&mut self) -> AuthResult<()> {
        // Dropping the handle deletes the context in the library.
        match self {
            Self::Client(ctx) => drop(ctx.take()),
            Self::Server(ctx) => drop(ctx.take()),
        }
        Ok(())
    }
}

//! GSSAPI security-context negotiation.
//!
//! The low-level negotiation (Kerberos tickets, token cryptography) belongs to
//! a [`SecurityContextProvider`]. This module drives a provider from both ends:
//!
//! - [`ContextInitiator`] - client side, produces the base64 login token
//! - [`LoginAcceptor`] - server side, consumes it and issues a credential
//!
//! Providers are blocking (they call into the system GSSAPI library), so every
//! negotiation runs on a tokio blocking worker under a timeout. The context is
//! owned by a [`ContextGuard`] that lives on that worker, which means it is
//! released even when the caller times out or drops the future.

pub mod acceptor;
pub mod initiator;
#[cfg(feature = "gssapi")]
pub mod krb5;

pub use acceptor::LoginAcceptor;
pub use initiator::ContextInitiator;
#[cfg(feature = "gssapi")]
pub use krb5::Krb5Provider;

use std::fmt::Debug;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use crate::error::{AuthError, AuthResult};

/// Result of one negotiation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationStep {
    /// Negotiation completed; the output token (possibly empty) goes to the peer.
    Complete(Vec<u8>),
    /// More rounds required; this token goes to the peer.
    Continue(Vec<u8>),
}

/// Provider-owned negotiation state for one attempt.
pub trait SecurityContext: Send {
    /// Feed the peer's token (none for the first initiator step) and advance.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NegotiationRejected`] when the peer's token is
    /// invalid, expired or fails mutual authentication.
    fn step(&mut self, input: Option<&[u8]>) -> AuthResult<NegotiationStep>;

    /// Name of the peer once negotiation completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the context is not established.
    fn peer_name(&mut self) -> AuthResult<String>;

    /// Free the provider resources behind this context.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to release the context.
    fn release(&mut self) -> AuthResult<()>;
}

/// Trait for security-context providers.
///
/// Implementations exist for the system Kerberos library (`gssapi` feature)
/// and for tests (`testing` feature).
pub trait SecurityContextProvider: Send + Sync + Debug {
    /// Get the mechanism name (e.g., "KRB5").
    fn mechanism_name(&self) -> &'static str;

    /// Import `name` using the provider's principal naming convention.
    ///
    /// Returns the name as the provider renders it back.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidPrincipalName`] if the name is rejected.
    fn import_name(&self, name: &str) -> AuthResult<String>;

    /// Open a context as the initiating party towards `target`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ProviderUnavailable`] if local credentials (the
    /// credential cache) are missing.
    fn initiate_context(&self, target: &str) -> AuthResult<Box<dyn SecurityContext>>;

    /// Open a context as the accepting party with the backend's credentials.
    ///
    /// `service_principal` pins the acceptor identity; `None` accepts for any
    /// principal in the keytab.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ProviderUnavailable`] if the service credentials
    /// (keytab) cannot be acquired.
    fn accept_context(&self, service_principal: Option<&str>)
        -> AuthResult<Box<dyn SecurityContext>>;

    /// Keytab the acceptor was explicitly pointed at, if any.
    fn keytab(&self) -> Option<&Path> {
        None
    }
}

/// Scoped owner of a [`SecurityContext`].
///
/// Releases the context when dropped. Release failures are logged and never
/// replace the attempt's outcome.
pub struct ContextGuard {
    context: Box<dyn SecurityContext>,
}

impl ContextGuard {
    /// Take ownership of a freshly opened context.
    #[must_use]
    pub fn new(context: Box<dyn SecurityContext>) -> Self {
        Self { context }
    }

    /// Advance the negotiation.
    ///
    /// # Errors
    ///
    /// Propagates provider errors.
    pub fn step(&mut self, input: Option<&[u8]>) -> AuthResult<NegotiationStep> {
        self.context.step(input)
    }

    /// Name of the negotiated peer.
    ///
    /// # Errors
    ///
    /// Propagates provider errors.
    pub fn peer_name(&mut self) -> AuthResult<String> {
        self.context.peer_name()
    }
}

impl Debug for ContextGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextGuard").finish_non_exhaustive()
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Err(e) = self.context.release() {
            warn!(error = %e, "failed to release security context");
        }
    }
}

/// Run a blocking negotiation on a worker thread, bounded by `limit`.
///
/// The closure keeps running to completion if the limit fires; anything it
/// owns (the [`ContextGuard`] in particular) is dropped on the worker.
///
/// # Errors
///
/// Returns [`AuthError::NegotiationTimeout`] if the limit elapses, or the
/// closure's own error.
pub(crate) async fn run_bounded<T, F>(limit: Duration, negotiation: F) -> AuthResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AuthResult<T> + Send + 'static,
{
    bounded(limit, tokio::task::spawn_blocking(negotiation)).await
}

async fn bounded<T, J>(limit: Duration, task: J) -> AuthResult<T>
where
    J: Future<Output = Result<AuthResult<T>, tokio::task::JoinError>>,
{
    match timeout(limit, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(AuthError::ProviderUnavailable(format!(
            "negotiation worker failed: {join_error}"
        ))),
        Err(_) => {
            warn!(timeout = ?limit, "security-context negotiation timed out");
            Err(AuthError::NegotiationTimeout(limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingContext {
        released: Arc<AtomicUsize>,
        fail_release: bool,
    }

    impl SecurityContext for CountingContext {
        fn step(&mut self, _input: Option<&[u8]>) -> AuthResult<NegotiationStep> {
            Ok(NegotiationStep::Complete(vec![1]))
        }

        fn peer_name(&mut self) -> AuthResult<String> {
            Ok("peer".to_string())
        }

        fn release(&mut self) -> AuthResult<()> {
            self.released.fetch_add(1, Ordering::SeqCst);
            if self.fail_release {
                Err(AuthError::ProviderUnavailable("release failed".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn guard(released: &Arc<AtomicUsize>, fail_release: bool) -> ContextGuard {
        ContextGuard::new(Box::new(CountingContext {
            released: Arc::clone(released),
            fail_release,
        }))
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        {
            let mut g = guard(&released, false);
            assert_eq!(g.step(None).unwrap(), NegotiationStep::Complete(vec![1]));
            assert_eq!(g.peer_name().unwrap(), "peer");
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_release_failure_does_not_panic() {
        let released = Arc::new(AtomicUsize::new(0));
        drop(guard(&released, true));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_bounded_returns_result() {
        let result = run_bounded(Duration::from_secs(1), || Ok(7)).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_run_bounded_propagates_error() {
        let result: AuthResult<()> = run_bounded(Duration::from_secs(1), || {
            Err(AuthError::NegotiationRejected("bad".to_string()))
        })
        .await;
        assert_eq!(
            result,
            Err(AuthError::NegotiationRejected("bad".to_string()))
        );
    }

    #[tokio::test]
    async fn test_run_bounded_times_out_and_still_releases() {
        let released = Arc::new(AtomicUsize::new(0));
        let g = guard(&released, false);

        let result: AuthResult<()> = run_bounded(Duration::from_millis(20), move || {
            let _g = g;
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        })
        .await;

        assert_eq!(
            result,
            Err(AuthError::NegotiationTimeout(Duration::from_millis(20)))
        );

        for _ in 0..50 {
            if released.load(Ordering::SeqCst) == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_bounded_worker_panic() {
        let result: AuthResult<()> =
            run_bounded(Duration::from_secs(1), || panic!("provider crashed")).await;
        assert!(matches!(result, Err(AuthError::ProviderUnavailable(_))));
    }
}

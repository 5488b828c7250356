//! Mock security-context provider for testing.
//!
//! A scripted provider that:
//! - Maps accepted tokens to principals
//! - Emits a fixed initiator token
//! - Counts opened and released contexts

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::auth::gssapi::{NegotiationStep, SecurityContext, SecurityContextProvider};
use crate::error::{AuthError, AuthResult};

/// Token emitted by the mock initiator unless overridden.
pub const DEFAULT_INITIATOR_TOKEN: &[u8] = b"mock-initiator-token";

/// Base64-encode raw token bytes the way clients send them.
#[must_use]
pub fn encode_token(token: &[u8]) -> String {
    BASE64.encode(token)
}

/// Counters shared between a [`MockProvider`] and its contexts.
#[derive(Debug, Default)]
pub struct MockStats {
    contexts_opened: AtomicUsize,
    contexts_released: AtomicUsize,
    accept_calls: AtomicUsize,
    initiate_calls: AtomicUsize,
    acceptor_names: Mutex<Vec<Option<String>>>,
    initiator_targets: Mutex<Vec<String>>,
}

/// Mock provider for tests.
#[derive(Debug, Clone)]
pub struct MockProvider {
    principals: HashMap<Vec<u8>, String>,
    initiator_token: Vec<u8>,
    incomplete: bool,
    unavailable: bool,
    fail_release: bool,
    echo: Option<String>,
    delay: Option<Duration>,
    keytab: Option<PathBuf>,
    stats: Arc<MockStats>,
}

impl MockProvider {
    /// Create a provider that accepts nothing and initiates with
    /// [`DEFAULT_INITIATOR_TOKEN`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            principals: HashMap::new(),
            initiator_token: DEFAULT_INITIATOR_TOKEN.to_vec(),
            incomplete: false,
            unavailable: false,
            fail_release: false,
            echo: None,
            delay: None,
            keytab: None,
            stats: Arc::new(MockStats::default()),
        }
    }

    /// Accept `token` as proof of `principal`.
    #[must_use]
    pub fn with_principal(mut self, token: impl Into<Vec<u8>>, principal: impl Into<String>) -> Self {
        self.principals.insert(token.into(), principal.into());
        self
    }

    /// Token produced by the initiating side.
    #[must_use]
    pub fn with_initiator_token(mut self, token: impl Into<Vec<u8>>) -> Self {
        self.initiator_token = token.into();
        self
    }

    /// Every step asks for another round.
    #[must_use]
    pub fn incomplete(mut self) -> Self {
        self.incomplete = true;
        self
    }

    /// Every step blocks for `delay` first.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Opening any context fails as if no credentials were available.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Name imports render back as `name`.
    #[must_use]
    pub fn echoing(mut self, name: impl Into<String>) -> Self {
        self.echo = Some(name.into());
        self
    }

    /// Report `keytab` as the acceptor keytab.
    #[must_use]
    pub fn with_keytab(mut self, keytab: impl Into<PathBuf>) -> Self {
        self.keytab = Some(keytab.into());
        self
    }

    /// Context release reports an error.
    #[must_use]
    pub fn fail_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    /// Number of contexts opened.
    pub fn contexts_opened(&self) -> usize {
        self.stats.contexts_opened.load(Ordering::SeqCst)
    }

    /// Number of contexts released.
    pub fn contexts_released(&self) -> usize {
        self.stats.contexts_released.load(Ordering::SeqCst)
    }

    /// Number of `accept_context` calls, successful or not.
    pub fn accept_calls(&self) -> usize {
        self.stats.accept_calls.load(Ordering::SeqCst)
    }

    /// Number of `initiate_context` calls, successful or not.
    pub fn initiate_calls(&self) -> usize {
        self.stats.initiate_calls.load(Ordering::SeqCst)
    }

    /// Service principals passed to `accept_context`, in call order.
    pub fn acceptor_names(&self) -> Vec<Option<String>> {
        self.stats.acceptor_names.lock().unwrap().clone()
    }

    /// Targets passed to `initiate_context`, in call order.
    pub fn initiator_targets(&self) -> Vec<String> {
        self.stats.initiator_targets.lock().unwrap().clone()
    }

    /// Wait until every opened context has been released, up to `limit`.
    ///
    /// Release can happen on a blocking worker after the caller has already
    /// seen a timeout.
    pub async fn wait_for_release(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if self.contexts_released() == self.contexts_opened() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.contexts_released() == self.contexts_opened()
    }

    fn open(&self, role: Role) -> AuthResult<Box<dyn SecurityContext>> {
        if self.unavailable {
            return Err(AuthError::ProviderUnavailable(
                "no credentials available".to_string(),
            ));
        }
        self.stats.contexts_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockContext {
            role,
            provider: self.clone(),
            peer: None,
            released: false,
        }))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityContextProvider for MockProvider {
    fn mechanism_name(&self) -> &'static str {
        "MOCK"
    }

    fn import_name(&self, name: &str) -> AuthResult<String> {
        if name.trim().is_empty() {
            return Err(AuthError::InvalidPrincipalName {
                requested: name.to_string(),
                reason: "empty name".to_string(),
            });
        }
        Ok(self.echo.clone().unwrap_or_else(|| name.to_string()))
    }

    fn keytab(&self) -> Option<&Path> {
        self.keytab.as_deref()
    }

    fn initiate_context(&self, target: &str) -> AuthResult<Box<dyn SecurityContext>> {
        self.stats.initiate_calls.fetch_add(1, Ordering::SeqCst);
        self.stats
            .initiator_targets
            .lock()
            .unwrap()
            .push(target.to_string());
        self.open(Role::Initiator)
    }

    fn accept_context(
        &self,
        service_principal: Option<&str>,
    ) -> AuthResult<Box<dyn SecurityContext>> {
        self.stats.accept_calls.fetch_add(1, Ordering::SeqCst);
        self.stats
            .acceptor_names
            .lock()
            .unwrap()
            .push(service_principal.map(str::to_string));
        self.open(Role::Acceptor)
    }
}

#[derive(Debug, Clone, Copy)]
enum Role {
    Initiator,
    Acceptor,
}

struct MockContext {
    role: Role,
    provider: MockProvider,
    peer: Option<String>,
    released: bool,
}

impl SecurityContext for MockContext {
    fn step(&mut self, input: Option<&[u8]>) -> AuthResult<NegotiationStep> {
        if let Some(delay) = self.provider.delay {
            std::thread::sleep(delay);
        }

        match self.role {
            Role::Initiator => {
                let token = self.provider.initiator_token.clone();
                if self.provider.incomplete {
                    Ok(NegotiationStep::Continue(token))
                } else {
                    Ok(NegotiationStep::Complete(token))
                }
            }
            Role::Acceptor => {
                let input = input.unwrap_or_default();
                if self.provider.incomplete {
                    return Ok(NegotiationStep::Continue(b"mock-continue".to_vec()));
                }
                match self.provider.principals.get(input) {
                    Some(principal) => {
                        self.peer = Some(principal.clone());
                        Ok(NegotiationStep::Complete(Vec::new()))
                    }
                    None => Err(AuthError::NegotiationRejected(
                        "unrecognized token".to_string(),
                    )),
                }
            }
        }
    }

    fn peer_name(&mut self) -> AuthResult<String> {
        self.peer.clone().ok_or_else(|| {
            AuthError::IncompleteNegotiation("context not established".to_string())
        })
    }

    fn release(&mut self) -> AuthResult<()> {
        if !self.released {
            self.released = true;
            self.provider
                .stats
                .contexts_released
                .fetch_add(1, Ordering::SeqCst);
        }
        if self.provider.fail_release {
            return Err(AuthError::ProviderUnavailable(
                "mock release failure".to_string(),
            ));
        }
        Ok(())
    }
}

//! Test utilities for the GSSAPI auth backend.
//!
//! This module provides infrastructure for integration testing without a KDC:
//!
//! - [`MockProvider`] - A scripted security-context provider
//! - [`config_store`] - A [`StaticConfigStore`] built from literal policy tables
//!
//! # Example
//!
//! ```rust,ignore
//! use gssapi_auth_core::testing::{config_store, encode_token, MockProvider};
//!
//! #[tokio::test]
//! async fn test_login() {
//!     let provider = Arc::new(MockProvider::new().with_principal(b"t1".to_vec(), "alice@EXAMPLE.COM"));
//!     let acceptor = LoginAcceptor::new(provider.clone(), Arc::new(TokenIssuer), Duration::from_secs(1));
//!     let store = config_store(&[("alice@EXAMPLE.COM", &["ops"])], &["default"]);
//!
//!     let credential = acceptor.login(&store, &encode_token(b"t1")).await.unwrap();
//!     assert_eq!(provider.contexts_released(), 1);
//! }
//! ```

pub mod mock_provider;

pub use mock_provider::{encode_token, MockProvider, MockStats, DEFAULT_INITIATOR_TOKEN};

use std::sync::Arc;
use std::time::Duration;

use crate::auth::policy::{InMemoryPolicyStore, StaticConfigStore};
use crate::lease::LeaseDefaults;

/// Lease defaults used by [`config_store`]: 60s ttl, 300s max, 60s increment.
pub const TEST_LEASE: LeaseDefaults = LeaseDefaults {
    ttl: Duration::from_secs(60),
    max_ttl: Duration::from_secs(300),
    increment: Duration::from_secs(60),
};

/// Build a config store from `(principal, policies)` pairs and default policies.
#[must_use]
pub fn config_store(principals: &[(&str, &[&str])], default_policies: &[&str]) -> StaticConfigStore {
    let mut store = InMemoryPolicyStore::new();
    for (principal, policies) in principals {
        store.add_principal(
            (*principal).to_string(),
            policies.iter().map(|p| (*p).to_string()),
        );
    }

    StaticConfigStore::new(
        Arc::new(store),
        default_policies.iter().map(|p| (*p).to_string()).collect(),
        TEST_LEASE,
    )
}

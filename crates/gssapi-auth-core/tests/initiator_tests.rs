//! Context initiator integration tests.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use gssapi_auth_core::auth::{ContextInitiator, LoginAcceptor};
use gssapi_auth_core::error::AuthError;
use gssapi_auth_core::lease::TokenIssuer;
use gssapi_auth_core::testing::{config_store, MockProvider};

#[tokio::test]
async fn test_initiator_token_logs_in() {
    let provider = Arc::new(
        MockProvider::new()
            .with_initiator_token(b"krb-ap-req".to_vec())
            .with_principal(b"krb-ap-req".to_vec(), "alice@EXAMPLE.COM"),
    );

    let token = ContextInitiator::new(provider.clone())
        .authenticate(None, "https://vault.example.com:8200/v1")
        .await
        .unwrap();

    let acceptor = LoginAcceptor::new(provider.clone(), Arc::new(TokenIssuer), Duration::from_secs(1));
    let credential = acceptor
        .login(&config_store(&[], &["default"]), &token)
        .await
        .unwrap();

    assert_eq!(credential.principal(), Some("alice@EXAMPLE.COM"));
    assert_eq!(provider.contexts_opened(), 2);
    assert_eq!(provider.contexts_released(), 2);
}

#[tokio::test]
async fn test_token_is_standard_base64() {
    let provider = Arc::new(MockProvider::new().with_initiator_token(vec![0xfb, 0xff, 0x00]));

    let token = ContextInitiator::new(provider)
        .authenticate(None, "vault.example.com")
        .await
        .unwrap();

    assert_eq!(token, "+/8A");
    assert_eq!(BASE64.decode(&token).unwrap(), vec![0xfb, 0xff, 0x00]);
}

#[tokio::test]
async fn test_derived_service_names() {
    let cases = [
        ("https://vault.example.com:8200", "vault/vault.example.com"),
        ("http://10.0.0.5", "vault/10.0.0.5"),
        ("vault.internal:8200", "vault/vault.internal"),
        ("https://[::1]:8200", "vault/::1"),
    ];

    for (endpoint, expected) in cases {
        let provider = Arc::new(MockProvider::new());
        ContextInitiator::new(provider.clone())
            .authenticate(None, endpoint)
            .await
            .unwrap();
        assert_eq!(provider.initiator_targets(), vec![expected.to_string()]);
    }
}

#[tokio::test]
async fn test_blank_hint_falls_back_to_endpoint() {
    let provider = Arc::new(MockProvider::new());
    ContextInitiator::new(provider.clone())
        .authenticate(Some("   "), "https://vault.example.com")
        .await
        .unwrap();
    assert_eq!(
        provider.initiator_targets(),
        vec!["vault/vault.example.com".to_string()]
    );
}

#[tokio::test]
async fn test_unparsable_endpoint() {
    let provider = Arc::new(MockProvider::new());
    let result = ContextInitiator::new(provider.clone())
        .authenticate(None, "https://")
        .await;

    assert!(matches!(result, Err(AuthError::InvalidEndpoint(_))));
    assert_eq!(provider.initiate_calls(), 0);
}

#[tokio::test]
async fn test_missing_credentials() {
    let provider = Arc::new(MockProvider::new().unavailable());
    let result = ContextInitiator::new(provider)
        .authenticate(None, "https://vault.example.com")
        .await;

    assert!(matches!(result, Err(AuthError::ProviderUnavailable(_))));
}

#[tokio::test]
async fn test_echo_mismatch() {
    let provider = Arc::new(MockProvider::new().echoing("vault/VAULT.EXAMPLE.COM"));
    let result = ContextInitiator::new(provider.clone())
        .authenticate(None, "https://vault.example.com")
        .await;

    match result {
        Err(AuthError::InvalidPrincipalName { requested, .. }) => {
            assert_eq!(requested, "vault/vault.example.com");
        }
        other => panic!("expected InvalidPrincipalName, got {other:?}"),
    }
    assert_eq!(provider.contexts_opened(), 0);
}

#[tokio::test]
async fn test_multi_round_initiation_rejected() {
    let provider = Arc::new(MockProvider::new().incomplete());
    let result = ContextInitiator::new(provider.clone())
        .authenticate(None, "https://vault.example.com")
        .await;

    assert!(matches!(result, Err(AuthError::IncompleteNegotiation(_))));
    assert_eq!(provider.contexts_released(), 1);
}

#[tokio::test]
async fn test_initiation_timeout() {
    let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(200)));
    let result = ContextInitiator::new(provider.clone())
        .with_timeout(Duration::from_millis(20))
        .authenticate(None, "https://vault.example.com")
        .await;

    assert!(matches!(result, Err(AuthError::NegotiationTimeout(_))));
    assert!(provider.wait_for_release(Duration::from_secs(2)).await);
}

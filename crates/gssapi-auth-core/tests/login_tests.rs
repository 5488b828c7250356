//! Login path integration tests.
//!
//! Drive the login acceptor and the backend façade against the mock
//! security-context provider.

use std::sync::Arc;
use std::time::Duration;

use gssapi_auth_core::auth::LoginAcceptor;
use gssapi_auth_core::error::AuthError;
use gssapi_auth_core::lease::{TokenIssuer, METADATA_PRINCIPAL};
use gssapi_auth_core::testing::{config_store, encode_token, MockProvider};

fn acceptor(provider: &Arc<MockProvider>, timeout: Duration) -> LoginAcceptor {
    LoginAcceptor::new(provider.clone(), Arc::new(TokenIssuer), timeout)
}

fn alice_and_bob() -> MockProvider {
    MockProvider::new()
        .with_principal(b"alice-token".to_vec(), "alice@EXAMPLE.COM")
        .with_principal(b"bob-token".to_vec(), "bob@EXAMPLE.COM")
}

/// A mapped principal gets exactly its policies and its name in metadata.
#[tokio::test]
async fn test_mapped_principal_policies() {
    let provider = Arc::new(alice_and_bob());
    let store = config_store(&[("alice@EXAMPLE.COM", &["default", "ops"])], &[]);

    let credential = acceptor(&provider, Duration::from_secs(1))
        .login(&store, &encode_token(b"alice-token"))
        .await
        .unwrap();

    let policies: Vec<&str> = credential.policies.iter().map(String::as_str).collect();
    assert_eq!(policies, vec!["default", "ops"]);
    assert_eq!(
        credential.metadata.get(METADATA_PRINCIPAL).map(String::as_str),
        Some("alice@EXAMPLE.COM")
    );
    assert_eq!(credential.lease.ttl, Duration::from_secs(60));
    assert_eq!(credential.lease.max_ttl, Duration::from_secs(300));
}

#[tokio::test]
async fn test_unmapped_principal_without_default() {
    let provider = Arc::new(alice_and_bob());
    let store = config_store(&[("alice@EXAMPLE.COM", &["ops"])], &[]);

    let result = acceptor(&provider, Duration::from_secs(1))
        .login(&store, &encode_token(b"bob-token"))
        .await;

    assert_eq!(
        result,
        Err(AuthError::UnknownPrincipal("bob@EXAMPLE.COM".to_string()))
    );
    assert_eq!(provider.contexts_released(), provider.contexts_opened());
}

#[tokio::test]
async fn test_unmapped_principal_with_default() {
    let provider = Arc::new(alice_and_bob());
    let store = config_store(&[("alice@EXAMPLE.COM", &["ops"])], &["default"]);

    let credential = acceptor(&provider, Duration::from_secs(1))
        .login(&store, &encode_token(b"bob-token"))
        .await
        .unwrap();

    assert_eq!(
        credential.policies.into_iter().collect::<Vec<_>>(),
        vec!["default".to_string()]
    );
}

#[tokio::test]
async fn test_short_name_mapping() {
    let provider = Arc::new(alice_and_bob());
    let store = config_store(&[("bob", &["readonly"])], &[])
        .with_service_principal("vault/vault.example.com@EXAMPLE.COM");

    let credential = acceptor(&provider, Duration::from_secs(1))
        .login(&store, &encode_token(b"bob-token"))
        .await
        .unwrap();

    assert!(credential.policies.contains("readonly"));
    assert_eq!(credential.principal(), Some("bob@EXAMPLE.COM"));
}

/// A trusted foreign realm does not pick up a local short name's policies.
#[tokio::test]
async fn test_short_name_mapping_skips_foreign_realm() {
    let provider = Arc::new(
        MockProvider::new().with_principal(b"partner-token".to_vec(), "bob@PARTNER.ORG"),
    );
    let store = config_store(&[("bob", &["admin"])], &[])
        .with_service_principal("vault/vault.example.com@EXAMPLE.COM");

    let result = acceptor(&provider, Duration::from_secs(1))
        .login(&store, &encode_token(b"partner-token"))
        .await;

    assert_eq!(
        result,
        Err(AuthError::UnknownPrincipal("bob@PARTNER.ORG".to_string()))
    );
    assert_eq!(provider.contexts_released(), provider.contexts_opened());
}

/// Malformed input never reaches the provider.
#[tokio::test]
async fn test_malformed_tokens_never_reach_provider() {
    let provider = Arc::new(alice_and_bob());
    let store = config_store(&[], &["default"]);
    let acceptor = acceptor(&provider, Duration::from_secs(1));

    for token in ["%%%", "not base64", "", "YWxpY2U"] {
        let result = acceptor.login(&store, token).await;
        assert!(
            matches!(result, Err(AuthError::MalformedToken(_))),
            "expected MalformedToken for {token:?}, got {result:?}"
        );
    }

    assert_eq!(provider.accept_calls(), 0);
    assert_eq!(provider.contexts_opened(), 0);
}

#[tokio::test]
async fn test_rejected_token() {
    let provider = Arc::new(alice_and_bob());
    let store = config_store(&[], &["default"]);

    let result = acceptor(&provider, Duration::from_secs(1))
        .login(&store, &encode_token(b"forged"))
        .await;

    assert!(matches!(result, Err(AuthError::NegotiationRejected(_))));
    assert_eq!(provider.contexts_opened(), 1);
    assert_eq!(provider.contexts_released(), 1);
}

#[tokio::test]
async fn test_multi_round_is_incomplete() {
    let provider = Arc::new(alice_and_bob().incomplete());
    let store = config_store(&[], &["default"]);

    let result = acceptor(&provider, Duration::from_secs(1))
        .login(&store, &encode_token(b"alice-token"))
        .await;

    assert!(matches!(result, Err(AuthError::IncompleteNegotiation(_))));
    assert_eq!(provider.contexts_released(), 1);
}

#[tokio::test]
async fn test_provider_unavailable_is_surfaced() {
    let provider = Arc::new(alice_and_bob().unavailable());
    let store = config_store(&[], &["default"]);

    let result = acceptor(&provider, Duration::from_secs(1))
        .login(&store, &encode_token(b"alice-token"))
        .await;

    assert!(matches!(result, Err(AuthError::ProviderUnavailable(_))));
}

/// Release failures are logged and never change the outcome.
#[tokio::test]
async fn test_release_failure_keeps_outcome() {
    let provider = Arc::new(alice_and_bob().fail_release());
    let store = config_store(&[], &["default"]);

    let credential = acceptor(&provider, Duration::from_secs(1))
        .login(&store, &encode_token(b"alice-token"))
        .await
        .unwrap();

    assert_eq!(credential.principal(), Some("alice@EXAMPLE.COM"));
    assert_eq!(provider.contexts_released(), 1);
}

/// Every login issues a distinct credential.
#[tokio::test]
async fn test_repeated_logins_issue_distinct_tokens() {
    let provider = Arc::new(alice_and_bob());
    let store = config_store(&[], &["default"]);
    let acceptor = acceptor(&provider, Duration::from_secs(1));

    let first = acceptor
        .login(&store, &encode_token(b"alice-token"))
        .await
        .unwrap();
    let second = acceptor
        .login(&store, &encode_token(b"alice-token"))
        .await
        .unwrap();

    assert_ne!(first.client_token, second.client_token);
    assert_eq!(provider.contexts_released(), 2);
}

#[tokio::test]
async fn test_concurrent_logins_do_not_cross_talk() {
    let provider = Arc::new(alice_and_bob().with_delay(Duration::from_millis(50)));
    let store = config_store(
        &[("alice@EXAMPLE.COM", &["ops"]), ("bob@EXAMPLE.COM", &["dev"])],
        &[],
    );
    let acceptor = acceptor(&provider, Duration::from_secs(2));

    let alice_token = encode_token(b"alice-token");
    let bob_token = encode_token(b"bob-token");
    let (alice, bob) = tokio::join!(
        acceptor.login(&store, &alice_token),
        acceptor.login(&store, &bob_token),
    );
    let (alice, bob) = (alice.unwrap(), bob.unwrap());

    assert_eq!(alice.principal(), Some("alice@EXAMPLE.COM"));
    assert!(alice.policies.contains("ops"));
    assert!(!alice.policies.contains("dev"));
    assert_eq!(bob.principal(), Some("bob@EXAMPLE.COM"));
    assert!(bob.policies.contains("dev"));
    assert!(!bob.policies.contains("ops"));
    assert_eq!(provider.contexts_released(), 2);
}

#[tokio::test]
async fn test_timeout_still_releases_context() {
    let provider = Arc::new(alice_and_bob().with_delay(Duration::from_millis(200)));
    let store = config_store(&[], &["default"]);

    let result = acceptor(&provider, Duration::from_millis(20))
        .login(&store, &encode_token(b"alice-token"))
        .await;

    assert_eq!(
        result,
        Err(AuthError::NegotiationTimeout(Duration::from_millis(20)))
    );
    assert!(provider.wait_for_release(Duration::from_secs(2)).await);
    assert_eq!(provider.contexts_opened(), 1);
}

#[tokio::test]
async fn test_cancelled_login_still_releases_context() {
    let provider = Arc::new(alice_and_bob().with_delay(Duration::from_millis(200)));
    let store = config_store(&[], &["default"]);
    let acceptor = acceptor(&provider, Duration::from_secs(5));
    let token = encode_token(b"alice-token");

    let abandoned =
        tokio::time::timeout(Duration::from_millis(20), acceptor.login(&store, &token)).await;
    assert!(abandoned.is_err());

    assert!(provider.wait_for_release(Duration::from_secs(2)).await);
    assert_eq!(provider.contexts_opened(), 1);
}

//! Renewal integration tests: login, then renew the issued credential.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use gssapi_auth_core::auth::LoginAcceptor;
use gssapi_auth_core::error::AuthError;
use gssapi_auth_core::lease::{RenewalHandler, SessionCredential, TokenIssuer};
use gssapi_auth_core::testing::{config_store, encode_token, MockProvider, TEST_LEASE};

async fn issued() -> SessionCredential {
    let provider = Arc::new(
        MockProvider::new().with_principal(b"t1".to_vec(), "alice@EXAMPLE.COM"),
    );
    let acceptor = LoginAcceptor::new(provider, Arc::new(TokenIssuer), Duration::from_secs(1));
    let store = config_store(&[("alice@EXAMPLE.COM", &["ops"])], &[]);
    acceptor
        .login(&store, &encode_token(b"t1"))
        .await
        .unwrap()
}

fn handler() -> RenewalHandler {
    RenewalHandler::new(Arc::new(TokenIssuer), TEST_LEASE.increment)
}

fn after(credential: &SessionCredential, secs: u64) -> SystemTime {
    credential.lease.issued_at + Duration::from_secs(secs)
}

#[tokio::test]
async fn test_renew_issued_credential() {
    let credential = issued().await;
    let renewed = handler()
        .renew_at(&credential, after(&credential, 30))
        .unwrap();

    assert_eq!(renewed.lease.ttl, Duration::from_secs(60));
    assert_eq!(renewed.lease.renewed_at, after(&credential, 30));
    assert_eq!(renewed.policies, credential.policies);
    assert_eq!(renewed.principal(), Some("alice@EXAMPLE.COM"));
}

#[tokio::test]
async fn test_renew_now() {
    let credential = issued().await;
    let renewed = handler().renew(&credential).unwrap();
    assert!(renewed.lease.expires_at().unwrap() <= after(&credential, 300));
}

#[tokio::test]
async fn test_renewal_stops_at_max_ttl() {
    let credential = issued().await;

    let renewed = handler()
        .renew_at(&credential, after(&credential, 270))
        .unwrap();
    assert_eq!(renewed.lease.ttl, Duration::from_secs(30));

    assert_eq!(
        handler().renew_at(&renewed, after(&credential, 300)),
        Err(AuthError::LeaseExpired {
            elapsed_secs: 300,
            max_ttl_secs: 300
        })
    );
}

#[tokio::test]
async fn test_non_renewable_credential() {
    let mut credential = issued().await;
    credential.lease.renewable = false;

    assert_eq!(
        handler().renew_at(&credential, after(&credential, 1)),
        Err(AuthError::NotRenewable)
    );
}

#[tokio::test]
async fn test_credential_survives_json() {
    let credential = issued().await;
    let json = serde_json::to_string(&credential).unwrap();
    let restored: SessionCredential = serde_json::from_str(&json).unwrap();

    let renewed = handler()
        .renew_at(&restored, after(&credential, 10))
        .unwrap();
    assert_eq!(renewed.client_token, credential.client_token);
}

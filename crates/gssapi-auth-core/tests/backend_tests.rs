//! Backend façade integration tests.

use std::io::Write;
use std::sync::Arc;

use gssapi_auth_core::config::AuthConfig;
use gssapi_auth_core::handlers::{ErrorResponse, LoginRequest};
use gssapi_auth_core::testing::{encode_token, MockProvider};
use gssapi_auth_core::GssapiBackend;
use serde_json::json;
use tempfile::NamedTempFile;

fn backend_from_yaml(yaml: &str, provider: &Arc<MockProvider>) -> GssapiBackend {
    let config = AuthConfig::from_str(yaml).unwrap();
    GssapiBackend::from_config(provider.clone(), &config.backend).unwrap()
}

#[tokio::test]
async fn test_login_from_yaml_config() {
    let provider = Arc::new(
        MockProvider::new().with_principal(b"t1".to_vec(), "alice@EXAMPLE.COM"),
    );
    let backend = backend_from_yaml(
        r#"
backend:
  service_principal: "vault/vault.example.com@EXAMPLE.COM"
  policies:
    principals:
      - principal: "alice@EXAMPLE.COM"
        policies: [default, ops]
  lease:
    ttl_secs: 120
    max_ttl_secs: 600
"#,
        &provider,
    );

    let response = backend
        .handle_login(&LoginRequest::new(encode_token(b"t1")))
        .await
        .unwrap();

    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["auth"]["policies"], json!(["default", "ops"]));
    assert_eq!(body["auth"]["metadata"]["principal"], "alice@EXAMPLE.COM");
    assert_eq!(body["auth"]["lease_duration"], 120);
    assert_eq!(body["auth"]["renewable"], true);
    assert_eq!(
        provider.acceptor_names(),
        vec![Some("vault/vault.example.com@EXAMPLE.COM".to_string())]
    );
}

#[tokio::test]
async fn test_login_with_policy_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "# principal: policies").unwrap();
    writeln!(file, "svc: batch").unwrap();
    file.flush().unwrap();

    let provider = Arc::new(
        MockProvider::new().with_principal(b"t1".to_vec(), "svc@EXAMPLE.COM"),
    );
    let yaml = format!(
        "backend:\n  policies:\n    file: \"{}\"\n",
        file.path().display()
    );
    let backend = backend_from_yaml(&yaml, &provider);

    let response = backend
        .handle_login(&LoginRequest::new(encode_token(b"t1")))
        .await
        .unwrap();
    assert_eq!(response.auth.policies, vec!["batch"]);
}

#[tokio::test]
async fn test_legacy_request_field() {
    let provider = Arc::new(
        MockProvider::new().with_principal(b"t1".to_vec(), "alice@EXAMPLE.COM"),
    );
    let backend = backend_from_yaml("backend:\n  default_policies: [default]\n", &provider);

    let request: LoginRequest =
        serde_json::from_value(json!({ "GssAPIToken": encode_token(b"t1") })).unwrap();
    let response = backend.handle_login(&request).await.unwrap();
    assert_eq!(response.auth.policies, vec!["default"]);
}

#[tokio::test]
async fn test_errors_render_kind_and_message() {
    let provider = Arc::new(MockProvider::new());
    let backend = backend_from_yaml("backend:\n  default_policies: [default]\n", &provider);

    let err = backend
        .handle_login(&LoginRequest::new("@@not-base64@@"))
        .await
        .unwrap_err();

    let body = serde_json::to_value(&err).unwrap();
    assert_eq!(body["error"], "malformed_token");
    assert!(body["message"].as_str().unwrap().contains("malformed token"));
    assert_eq!(
        serde_json::from_value::<ErrorResponse>(body).unwrap(),
        err
    );
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let config = AuthConfig::from_str("backend:\n  lease:\n    ttl_secs: 0\n");
    assert!(config.is_err());
}

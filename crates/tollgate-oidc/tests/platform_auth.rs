//! Integration tests for PlatformAuth: header parsing, identity mapping and
//! verification-status enrichment through the authority API.

#![cfg(feature = "platform")]

mod common;

use common::{claims, provider, sign, AUDIENCE};
use serde_json::json;
use tollgate_client::ClientConfig;
use tollgate_oidc::{
    apply_rules, ownership_filter, require_scopes, PlatformAuth, PlatformAuthConfig,
    VerifierConfig,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn api_server(status_body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/partner/auth"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"token": "tok-1", "expiresIn": 3600})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/status/user-42"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body))
        .mount(&server)
        .await;
    server
}

fn config(oidc: &MockServer) -> PlatformAuthConfig {
    PlatformAuthConfig::new(VerifierConfig::new(oidc.uri()).with_audience(AUDIENCE))
}

fn api_config(api: &MockServer) -> ClientConfig {
    ClientConfig::new(api.uri(), "partner-1", "secret-1")
}

fn bearer(oidc: &MockServer) -> String {
    format!("Bearer {}", sign(&claims(&oidc.uri(), "user-42"), Some("k1")))
}

#[tokio::test]
async fn test_missing_or_malformed_header() {
    let oidc = provider().await;
    let auth = PlatformAuth::new(config(&oidc)).unwrap();

    for value in [None, Some("Basic dXNlcjpwYXNz"), Some("bearer abc"), Some("Bearer")] {
        let err = auth.authenticate(value).await.unwrap_err();
        assert_eq!(err.status(), 401);
        assert_eq!(err.message(), "Missing or invalid Authorization header");
    }
}

#[tokio::test]
async fn test_authenticate_builds_user() {
    let oidc = provider().await;
    let auth = PlatformAuth::new(config(&oidc)).unwrap();

    let user = auth.authenticate(Some(&bearer(&oidc))).await.unwrap();
    assert_eq!(user.identity, "user-42");
    assert!(user.is_authenticated);
    assert_eq!(user.scopes, vec!["openid", "email", "threads:write"]);
    assert_eq!(user.permissions, user.scopes);
    assert_eq!(user.email.as_deref(), Some("user@example.com"));
    // No API configured.
    assert!(!user.verified);
}

#[tokio::test]
async fn test_verification_status_enrichment() {
    let oidc = provider().await;
    let api = api_server(json!({"kycVerified": true})).await;
    let auth = PlatformAuth::new(config(&oidc).with_api(api_config(&api))).unwrap();

    let user = auth.authenticate(Some(&bearer(&oidc))).await.unwrap();
    assert!(user.verified);
}

#[tokio::test]
async fn test_verification_status_snake_case() {
    let oidc = provider().await;
    let api = api_server(json!({"kyc_verified": true})).await;
    let auth = PlatformAuth::new(config(&oidc).with_api(api_config(&api))).unwrap();

    let user = auth.authenticate(Some(&bearer(&oidc))).await.unwrap();
    assert!(user.verified);
}

#[tokio::test]
async fn test_enrichment_failure_reads_unverified() {
    let oidc = provider().await;
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/partner/auth"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&api)
        .await;
    let auth = PlatformAuth::new(config(&oidc).with_api(api_config(&api))).unwrap();

    let user = auth.authenticate(Some(&bearer(&oidc))).await.unwrap();
    assert_eq!(user.identity, "user-42");
    assert!(!user.verified);
}

#[tokio::test]
async fn test_require_verification_rejects_unverified() {
    let oidc = provider().await;
    let api = api_server(json!({"kycVerified": false})).await;
    let auth = PlatformAuth::new(
        config(&oidc)
            .with_api(api_config(&api))
            .with_require_verification(true),
    )
    .unwrap();

    let err = auth.authenticate(Some(&bearer(&oidc))).await.unwrap_err();
    assert_eq!(err.status(), 403);
    assert_eq!(err.message(), "Verification required");
}

#[tokio::test]
async fn test_require_verification_accepts_verified() {
    let oidc = provider().await;
    let api = api_server(json!({"kycVerified": true})).await;
    let auth = PlatformAuth::new(
        config(&oidc)
            .with_api(api_config(&api))
            .with_require_verification(true),
    )
    .unwrap();

    assert!(auth.authenticate(Some(&bearer(&oidc))).await.is_ok());
}

#[tokio::test]
async fn test_verifier_errors_propagate() {
    let oidc = provider().await;
    let auth = PlatformAuth::new(config(&oidc)).unwrap();

    let mut c = claims(&oidc.uri(), "user-42");
    c["aud"] = json!("someone-else");
    let header = format!("Bearer {}", sign(&c, Some("k1")));

    let err = auth.authenticate(Some(&header)).await.unwrap_err();
    assert_eq!(err.status(), 401);
    assert_eq!(err.message(), "Invalid token audience");
}

#[tokio::test]
async fn test_authenticated_user_through_rules() {
    let oidc = provider().await;
    let auth = PlatformAuth::new(config(&oidc)).unwrap();
    let user = auth.authenticate(Some(&bearer(&oidc))).await.unwrap();

    let value = apply_rules(
        &[&require_scopes(["threads:write"]), &ownership_filter()],
        &user,
        json!({"title": "x"}),
    )
    .unwrap();
    assert_eq!(value, json!({"title": "x", "owner": "user-42"}));

    let err = apply_rules(&[&require_scopes(["admin"])], &user, json!({})).unwrap_err();
    assert_eq!(err.status(), 403);
}

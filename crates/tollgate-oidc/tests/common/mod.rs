//! Shared fixtures: an RSA signing key, its JWK form and a mocked provider.

#![allow(dead_code)]

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const AUDIENCE: &str = "tollgate";

// Key generation is slow in debug builds; share one key per test binary.
fn private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("failed to generate RSA key")
    })
}

fn encoding_key() -> EncodingKey {
    let pem = private_key()
        .to_pkcs1_pem(LineEnding::LF)
        .expect("failed to encode private key");
    EncodingKey::from_rsa_pem(pem.as_bytes()).expect("failed to load private key")
}

/// Public half of the shared key as a JWK with `kid`.
pub fn jwk(kid: &str) -> Value {
    let public = private_key().to_public_key();
    json!({
        "kty": "RSA",
        "use": "sig",
        "alg": "RS256",
        "kid": kid,
        "n": URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
        "e": URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
    })
}

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_secs()
}

/// Standard claims for `issuer`, valid for an hour.
pub fn claims(issuer: &str, sub: &str) -> Value {
    let now = now();
    json!({
        "iss": issuer,
        "sub": sub,
        "aud": AUDIENCE,
        "iat": now,
        "exp": now + 3600,
        "scope": "openid email threads:write",
        "email": "user@example.com",
    })
}

/// RS256 token over `claims` with `kid` in the header.
pub fn sign(claims: &Value, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_owned);
    encode(&header, claims, &encoding_key()).expect("failed to sign token")
}

pub fn discovery_mock(server: &MockServer) -> Mock {
    let issuer = server.uri();
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": issuer,
            "jwks_uri": format!("{}/jwks", issuer),
            "userinfo_endpoint": format!("{}/userinfo", issuer),
        })))
}

pub fn jwks_mock(kids: &[&str]) -> Mock {
    let keys: Vec<Value> = kids.iter().map(|kid| jwk(kid)).collect();
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
}

/// Provider publishing discovery and a key set containing `k1`.
pub async fn provider() -> MockServer {
    let server = MockServer::start().await;
    discovery_mock(&server).mount(&server).await;
    jwks_mock(&["k1"]).mount(&server).await;
    server
}

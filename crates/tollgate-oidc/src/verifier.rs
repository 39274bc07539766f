//! OIDC bearer token verification.
//!
//! Signed tokens (three dot-separated segments with a decodable header) are
//! verified locally against the provider's published key set. Anything else is
//! treated as an opaque token and introspected through the userinfo endpoint.

use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, Algorithm, Header, Validation};
use serde_json::{Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::cache::{DiscoveryDocument, VerifierCache};
use crate::config::VerifierConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwks::{JwksDocument, KeySet, SigningKey};

/// Verified assertions about the caller. Always contains `sub`.
pub type Claims = Map<String, Value>;

const USER_AGENT_VALUE: &str = concat!("tollgate-oidc/", env!("CARGO_PKG_VERSION"));

/// Header of `token` when it is structurally a JWT.
fn jwt_header(token: &str) -> Option<Header> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    decode_header(token).ok()
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::unauthorized("Token has expired"),
        ErrorKind::InvalidIssuer => AuthError::unauthorized("Invalid token issuer"),
        ErrorKind::InvalidAudience => AuthError::unauthorized("Invalid token audience"),
        _ => AuthError::unauthorized(format!("Invalid token: {}", err)),
    }
}

pub struct TokenVerifier {
    config: VerifierConfig,
    issuer: String,
    http: reqwest::Client,
    cache: VerifierCache,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("issuer", &self.issuer)
            .field("audience", &self.config.audience)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(config: VerifierConfig) -> AuthResult<Self> {
        let cache = VerifierCache::new(config.jwks_cache_ttl);
        Self::with_cache(config, cache)
    }

    /// Build a verifier backed by an existing (possibly shared) cache.
    pub fn with_cache(config: VerifierConfig, cache: VerifierCache) -> AuthResult<Self> {
        let issuer = config.normalized_issuer().to_string();
        Url::parse(&issuer)
            .map_err(|e| AuthError::config(format!("invalid issuer URL '{}': {}", issuer, e)))?;

        let builder = reqwest::Client::builder().user_agent(USER_AGENT_VALUE);
        let http = config
            .tls
            .apply_async(builder)
            .map_err(|e| AuthError::config(e.message))?
            .build()
            .map_err(|e| AuthError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            issuer,
            http,
            cache,
        })
    }

    pub fn from_env() -> AuthResult<Self> {
        Self::new(VerifierConfig::from_env()?)
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn cache(&self) -> &VerifierCache {
        &self.cache
    }

    /// Verify `token` and return its claims.
    pub async fn verify_token(&self, token: &str) -> AuthResult<Claims> {
        match jwt_header(token) {
            Some(header) => self.verify_jwt(token, &header).await,
            None => {
                debug!("token is not a JWT, using userinfo");
                self.userinfo(token).await
            }
        }
    }

    async fn verify_jwt(&self, token: &str, header: &Header) -> AuthResult<Claims> {
        let signing_key = self.signing_key(header.kid.as_deref(), header.alg).await?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.config.clock_skew_leeway.as_secs();
        validation.validate_nbf = true;
        validation.set_issuer(&[self.issuer.as_str()]);
        match &self.config.audience {
            Some(audience) => {
                validation.set_audience(&[audience.as_str()]);
                validation.set_required_spec_claims(&["exp", "iss", "aud"]);
            }
            None => {
                validation.validate_aud = false;
                validation.set_required_spec_claims(&["exp", "iss"]);
            }
        }

        let data = decode::<Claims>(token, &signing_key.key, &validation).map_err(map_jwt_error)?;
        if !data.claims.contains_key("sub") {
            return Err(AuthError::unauthorized("Token missing required 'sub' claim"));
        }

        debug!(kid = ?header.kid, "token signature verified");
        Ok(data.claims)
    }

    async fn signing_key(&self, kid: Option<&str>, alg: Algorithm) -> AuthResult<SigningKey> {
        let jwks_uri = self.jwks_uri().await?;

        let key_set = self.key_set(&jwks_uri).await?;
        if let Some(key) = key_set.find(kid, alg) {
            return Ok(key.clone());
        }

        // Unknown kid: the provider may have rotated keys since the last fetch.
        if kid.is_some() && key_set.fetched_at.elapsed() >= self.config.jwks_refresh_interval {
            info!(kid = ?kid, uri = %jwks_uri, "unknown kid, refreshing JWKS");
            self.cache.key_sets.invalidate(&jwks_uri).await;
            let key_set = self.key_set(&jwks_uri).await?;
            if let Some(key) = key_set.find(kid, alg) {
                return Ok(key.clone());
            }
        }

        Err(AuthError::unauthorized(format!(
            "No signing key found for kid={}",
            kid.unwrap_or("None")
        )))
    }

    async fn discovery(&self) -> AuthResult<Arc<DiscoveryDocument>> {
        self.cache
            .discovery
            .try_get_with(self.issuer.clone(), self.fetch_discovery())
            .await
            .map_err(|e| (*e).clone())
    }

    async fn fetch_discovery(&self) -> AuthResult<Arc<DiscoveryDocument>> {
        let url = format!("{}/.well-known/openid-configuration", self.issuer);
        info!(issuer = %self.issuer, "fetching OIDC discovery document");

        let response = self.http.get(&url).send().await?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(AuthError::provider(
                500,
                format!("OIDC discovery failed: {}", status),
            ));
        }

        let document: DiscoveryDocument = response.json().await.map_err(|e| {
            AuthError::provider(500, format!("invalid OIDC discovery document: {}", e))
        })?;
        Ok(Arc::new(document))
    }

    async fn jwks_uri(&self) -> AuthResult<String> {
        self.discovery()
            .await?
            .jwks_uri
            .clone()
            .ok_or_else(|| AuthError::provider(500, "OIDC provider does not expose a jwks_uri"))
    }

    async fn key_set(&self, jwks_uri: &str) -> AuthResult<Arc<KeySet>> {
        self.cache
            .key_sets
            .try_get_with(jwks_uri.to_string(), self.fetch_key_set(jwks_uri))
            .await
            .map_err(|e| (*e).clone())
    }

    async fn fetch_key_set(&self, jwks_uri: &str) -> AuthResult<Arc<KeySet>> {
        info!(uri = %jwks_uri, "fetching JWKS");

        let response = self.http.get(jwks_uri).send().await?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(AuthError::provider(500, format!("JWKS fetch failed: {}", status)));
        }

        let document: JwksDocument = response
            .json()
            .await
            .map_err(|e| AuthError::provider(500, format!("invalid JWKS document: {}", e)))?;
        let key_set = KeySet::from_document(document);
        debug!(uri = %jwks_uri, keys = key_set.len(), "JWKS cached");
        Ok(Arc::new(key_set))
    }

    async fn userinfo(&self, token: &str) -> AuthResult<Claims> {
        let discovery = self.discovery().await?;
        let endpoint = discovery.userinfo_endpoint.as_deref().ok_or_else(|| {
            AuthError::unauthorized("OIDC provider does not expose a userinfo endpoint")
        })?;

        let response = self.http.get(endpoint).bearer_auth(token).send().await?;
        let status = response.status().as_u16();
        if status == 401 {
            return Err(AuthError::unauthorized("Invalid or expired token"));
        }
        if status >= 400 {
            return Err(AuthError::provider(
                status,
                format!("Userinfo request failed with status {}", status),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AuthError::provider(500, format!("invalid userinfo response: {}", e)))?;
        match body {
            Value::Object(claims) if claims.contains_key("sub") => Ok(claims),
            _ => Err(AuthError::unauthorized(
                "Userinfo response missing required 'sub' field",
            )),
        }
    }
}

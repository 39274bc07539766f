//! Partner-authenticated API client.
//!
//! Public API: no status code knowledge. All status mapping lives in http.rs.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::credential::{parse_exchange, CredentialCache, PartnerAuthRequest};
use crate::error::{codes, ApiClientError, ClientResult};

mod http;

use http::interpret;

const USER_AGENT_VALUE: &str = concat!("tollgate-client/", env!("CARGO_PKG_VERSION"));
const PARTNER_AUTH_PATH: &str = "/partner/auth";

/// HTTP client for the authority API.
///
/// Obtains a bearer credential through the partner exchange on first use and
/// reuses it until it is about to expire. Clones share the credential and both
/// connection pools.
///
/// The `*_blocking` methods drive a separate blocking pool and must not be
/// called from inside an async runtime.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    base_url: String,
    credential: CredentialCache,
    async_pool: Mutex<Option<reqwest::Client>>,
    blocking_pool: Mutex<Option<reqwest::blocking::Client>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    headers
}

fn build_error(e: reqwest::Error) -> ApiClientError {
    ApiClientError::config(format!("failed to create HTTP client: {}", e))
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        // Surface unreadable TLS material at construction rather than first use.
        config.tls.apply_async(reqwest::Client::builder())?;

        let base_url = config.api_url.trim_end_matches('/').to_string();
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                base_url,
                credential: CredentialCache::default(),
                async_pool: Mutex::new(None),
                blocking_pool: Mutex::new(None),
            }),
        })
    }

    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    fn auth_request(&self) -> PartnerAuthRequest<'_> {
        PartnerAuthRequest {
            partner_id: &self.inner.config.partner_id,
            partner_secret: &self.inner.config.partner_secret,
        }
    }

    /// Drop the cached credential; the next request re-authenticates.
    pub fn invalidate_credential(&self) {
        debug!("credential invalidated");
        self.inner.credential.clear();
    }

    /// Release both connection pools. The next request recreates them.
    ///
    /// Call from outside an async runtime if the blocking pool has been used.
    pub fn close(&self) {
        let async_pool = self
            .inner
            .async_pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let blocking_pool = self
            .inner
            .blocking_pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!(
            async_pool = async_pool.is_some(),
            blocking_pool = blocking_pool.is_some(),
            "releasing connection pools"
        );
    }

    // ---- async ----

    fn async_pool(&self) -> ClientResult<reqwest::Client> {
        let mut guard = self
            .inner
            .async_pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let builder = reqwest::Client::builder().default_headers(default_headers());
        let client = self
            .inner
            .config
            .tls
            .apply_async(builder)?
            .build()
            .map_err(build_error)?;
        *guard = Some(client.clone());
        Ok(client)
    }

    async fn bearer(&self) -> ClientResult<String> {
        if let Some(token) = self.inner.credential.current() {
            return Ok(token);
        }

        let url = self.url(PARTNER_AUTH_PATH);
        info!(partner_id = %self.inner.config.partner_id, "exchanging partner credentials");

        let response = self
            .async_pool()?
            .post(&url)
            .json(&self.auth_request())
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let credential = parse_exchange(status, &body)?;
        let token = credential.access_token.clone();
        self.inner.credential.store(credential);
        Ok(token)
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        let token = self.bearer().await?;
        let url = self.url(path);
        debug!(method = %method, url = %url, "api request");

        let mut request = self
            .async_pool()?
            .request(method, &url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        interpret(status, &text)
    }

    pub async fn get(&self, path: &str) -> ClientResult<Value> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        self.send(Method::POST, path, body).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        decode(self.get(path).await?)
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
    ) -> ClientResult<T> {
        decode(self.post(path, body).await?)
    }

    // ---- blocking ----

    fn blocking_pool(&self) -> ClientResult<reqwest::blocking::Client> {
        let mut guard = self
            .inner
            .blocking_pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let builder = reqwest::blocking::Client::builder().default_headers(default_headers());
        let client = self
            .inner
            .config
            .tls
            .apply_blocking(builder)?
            .build()
            .map_err(build_error)?;
        *guard = Some(client.clone());
        Ok(client)
    }

    fn bearer_blocking(&self) -> ClientResult<String> {
        if let Some(token) = self.inner.credential.current() {
            return Ok(token);
        }

        let url = self.url(PARTNER_AUTH_PATH);
        info!(partner_id = %self.inner.config.partner_id, "exchanging partner credentials");

        let response = self
            .blocking_pool()?
            .post(&url)
            .json(&self.auth_request())
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;

        let credential = parse_exchange(status, &body)?;
        let token = credential.access_token.clone();
        self.inner.credential.store(credential);
        Ok(token)
    }

    fn send_blocking(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        let token = self.bearer_blocking()?;
        let url = self.url(path);
        debug!(method = %method, url = %url, "api request (blocking)");

        let mut request = self
            .blocking_pool()?
            .request(method, &url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send()?;
        let status = response.status().as_u16();
        let text = response.text()?;
        interpret(status, &text)
    }

    pub fn get_blocking(&self, path: &str) -> ClientResult<Value> {
        self.send_blocking(Method::GET, path, None)
    }

    pub fn post_blocking(&self, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        self.send_blocking(Method::POST, path, body)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> ClientResult<T> {
    serde_json::from_value(value).map_err(|e| {
        ApiClientError::new(
            format!("Unexpected response shape: {}", e),
            codes::PARSE_ERROR,
            None,
        )
    })
}

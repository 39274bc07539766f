//! Client configuration and TLS trust policy.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ApiClientError, ClientResult};

fn default_api_url() -> String {
    "https://api.tollgate.dev".to_string()
}

fn default_verify_ssl() -> bool {
    true
}

/// TLS trust configuration applied identically to every outbound pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// PEM bundle added to the trusted roots.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,

    /// When false, certificate verification is disabled entirely.
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            ca_cert: None,
            verify_ssl: default_verify_ssl(),
        }
    }
}

impl TlsConfig {
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `TOLLGATE_CA_CERT` | Path to a PEM CA bundle |
    /// | `TOLLGATE_VERIFY_SSL` | `0`/`false` disables verification |
    pub fn from_env() -> Self {
        Self {
            ca_cert: std::env::var("TOLLGATE_CA_CERT").ok().map(PathBuf::from),
            verify_ssl: std::env::var("TOLLGATE_VERIFY_SSL")
                .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
                .unwrap_or_else(|_| default_verify_ssl()),
        }
    }

    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }

    pub fn with_verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    fn root_certificates(&self) -> ClientResult<Vec<reqwest::Certificate>> {
        let Some(path) = &self.ca_cert else {
            return Ok(Vec::new());
        };
        let pem = std::fs::read(path).map_err(|e| {
            ApiClientError::config(format!(
                "failed to read CA bundle {}: {}",
                path.display(),
                e
            ))
        })?;
        reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
            ApiClientError::config(format!("invalid CA bundle {}: {}", path.display(), e))
        })
    }

    /// Apply the trust policy to an async client builder.
    pub fn apply_async(
        &self,
        builder: reqwest::ClientBuilder,
    ) -> ClientResult<reqwest::ClientBuilder> {
        if !self.verify_ssl {
            return Ok(builder.danger_accept_invalid_certs(true));
        }
        Ok(self
            .root_certificates()?
            .into_iter()
            .fold(builder, |b, cert| b.add_root_certificate(cert)))
    }

    /// Apply the trust policy to a blocking client builder.
    pub fn apply_blocking(
        &self,
        builder: reqwest::blocking::ClientBuilder,
    ) -> ClientResult<reqwest::blocking::ClientBuilder> {
        if !self.verify_ssl {
            return Ok(builder.danger_accept_invalid_certs(true));
        }
        Ok(self
            .root_certificates()?
            .into_iter()
            .fold(builder, |b, cert| b.add_root_certificate(cert)))
    }
}

/// Connection settings for the authority API.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API; trailing slashes are ignored.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    pub partner_id: String,

    pub partner_secret: String,

    #[serde(default)]
    pub tls: TlsConfig,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("partner_id", &self.partner_id)
            .field("partner_secret", &"<redacted>")
            .field("tls", &self.tls)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(
        api_url: impl Into<String>,
        partner_id: impl Into<String>,
        partner_secret: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            partner_id: partner_id.into(),
            partner_secret: partner_secret.into(),
            tls: TlsConfig::default(),
        }
    }

    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `TOLLGATE_API_URL` | API base URL |
    /// | `TOLLGATE_PARTNER_ID` | Partner identifier |
    /// | `TOLLGATE_PARTNER_SECRET` | Partner secret |
    ///
    /// TLS settings are read by [`TlsConfig::from_env`].
    pub fn from_env() -> ClientResult<Self> {
        let partner_id = std::env::var("TOLLGATE_PARTNER_ID")
            .map_err(|_| ApiClientError::config("TOLLGATE_PARTNER_ID not set"))?;
        let partner_secret = std::env::var("TOLLGATE_PARTNER_SECRET")
            .map_err(|_| ApiClientError::config("TOLLGATE_PARTNER_SECRET not set"))?;
        Ok(Self {
            api_url: std::env::var("TOLLGATE_API_URL").unwrap_or_else(|_| default_api_url()),
            partner_id,
            partner_secret,
            tls: TlsConfig::from_env(),
        })
    }

    /// Like [`ClientConfig::from_env`] but `None` when any credential is absent or empty.
    pub fn from_env_optional() -> Option<Self> {
        let api_url = std::env::var("TOLLGATE_API_URL").ok()?;
        let partner_id = std::env::var("TOLLGATE_PARTNER_ID").ok()?;
        let partner_secret = std::env::var("TOLLGATE_PARTNER_SECRET").ok()?;
        if api_url.is_empty() || partner_id.is_empty() || partner_secret.is_empty() {
            return None;
        }
        Some(Self {
            api_url,
            partner_id,
            partner_secret,
            tls: TlsConfig::from_env(),
        })
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }
}

//! Verifier configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tollgate_client::TlsConfig;

use crate::error::{AuthError, AuthResult};

/// `Duration` fields as whole seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

fn default_jwks_cache_ttl() -> Duration {
    Duration::from_secs(3600)
}

fn default_clock_skew_leeway() -> Duration {
    Duration::from_secs(30)
}

fn default_jwks_refresh_interval() -> Duration {
    Duration::from_secs(60)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Expected `iss`; discovery is fetched from `{issuer_url}/.well-known/openid-configuration`.
    pub issuer_url: String,

    /// Expected `aud`. Audience is not checked when unset.
    #[serde(default)]
    pub audience: Option<String>,

    /// Lifetime of cached discovery documents and key sets.
    #[serde(default = "default_jwks_cache_ttl", with = "duration_secs")]
    pub jwks_cache_ttl: Duration,

    /// Tolerance applied to `exp` and `nbf`.
    #[serde(default = "default_clock_skew_leeway", with = "duration_secs")]
    pub clock_skew_leeway: Duration,

    /// Minimum age of a cached key set before an unknown `kid` forces a refetch.
    #[serde(default = "default_jwks_refresh_interval", with = "duration_secs")]
    pub jwks_refresh_interval: Duration,

    #[serde(default)]
    pub tls: TlsConfig,
}

impl VerifierConfig {
    pub fn new(issuer_url: impl Into<String>) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            audience: None,
            jwks_cache_ttl: default_jwks_cache_ttl(),
            clock_skew_leeway: default_clock_skew_leeway(),
            jwks_refresh_interval: default_jwks_refresh_interval(),
            tls: TlsConfig::default(),
        }
    }

    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `TOLLGATE_OIDC_ISSUER_URL` | Issuer URL (required) |
    /// | `TOLLGATE_OIDC_AUDIENCE` | Expected audience |
    /// | `TOLLGATE_JWKS_CACHE_TTL` | Cache lifetime in seconds (default: 3600) |
    /// | `TOLLGATE_CA_CERT`, `TOLLGATE_VERIFY_SSL` | TLS trust, see [`TlsConfig::from_env`] |
    pub fn from_env() -> AuthResult<Self> {
        let issuer_url = std::env::var("TOLLGATE_OIDC_ISSUER_URL")
            .map_err(|_| AuthError::config("TOLLGATE_OIDC_ISSUER_URL not set"))?;

        let mut config = Self::new(issuer_url).with_tls(TlsConfig::from_env());
        config.audience = std::env::var("TOLLGATE_OIDC_AUDIENCE")
            .ok()
            .filter(|a| !a.is_empty());

        if let Ok(v) = std::env::var("TOLLGATE_JWKS_CACHE_TTL") {
            let secs: u64 = v.parse().map_err(|_| {
                AuthError::config(format!("TOLLGATE_JWKS_CACHE_TTL is not a number: {}", v))
            })?;
            config.jwks_cache_ttl = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }

    pub fn with_clock_skew_leeway(mut self, leeway: Duration) -> Self {
        self.clock_skew_leeway = leeway;
        self
    }

    pub fn with_jwks_refresh_interval(mut self, interval: Duration) -> Self {
        self.jwks_refresh_interval = interval;
        self
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    /// Issuer URL without trailing slashes, as compared against `iss`.
    pub fn normalized_issuer(&self) -> &str {
        self.issuer_url.trim_end_matches('/')
    }
}

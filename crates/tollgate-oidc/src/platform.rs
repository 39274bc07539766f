//! Bearer-header authentication for platform services.
//!
//! Verifies the `Authorization` header, builds an [`AuthUser`] and, when
//! partner credentials are configured, enriches it with the caller's
//! verification status from the authority API.

use serde_json::Value;
use tollgate_client::{ApiClient, ClientConfig};
use tracing::{debug, warn};

use crate::authorization::AuthUser;
use crate::config::VerifierConfig;
use crate::error::{AuthError, AuthResult};
use crate::verifier::TokenVerifier;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone)]
pub struct PlatformAuthConfig {
    pub verifier: VerifierConfig,
    /// Partner credentials for verification-status lookups. Enrichment is
    /// skipped when unset.
    pub api: Option<ClientConfig>,
    /// Reject callers whose identity is not verified.
    pub require_verification: bool,
}

impl PlatformAuthConfig {
    pub fn new(verifier: VerifierConfig) -> Self {
        Self {
            verifier,
            api: None,
            require_verification: false,
        }
    }

    /// Verifier settings from `TOLLGATE_OIDC_*`; API credentials from
    /// `TOLLGATE_API_URL`, `TOLLGATE_PARTNER_ID` and `TOLLGATE_PARTNER_SECRET`
    /// when all three are set.
    pub fn from_env() -> AuthResult<Self> {
        Ok(Self {
            verifier: VerifierConfig::from_env()?,
            api: ClientConfig::from_env_optional(),
            require_verification: false,
        })
    }

    pub fn with_api(mut self, api: ClientConfig) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_require_verification(mut self, require: bool) -> Self {
        self.require_verification = require;
        self
    }
}

#[derive(Debug)]
pub struct PlatformAuth {
    verifier: TokenVerifier,
    api: Option<ApiClient>,
    require_verification: bool,
}

impl PlatformAuth {
    pub fn new(config: PlatformAuthConfig) -> AuthResult<Self> {
        let verifier = TokenVerifier::new(config.verifier)?;
        let api = config
            .api
            .map(ApiClient::new)
            .transpose()
            .map_err(|e| AuthError::config(e.message))?;
        Ok(Self {
            verifier,
            api,
            require_verification: config.require_verification,
        })
    }

    pub fn from_env() -> AuthResult<Self> {
        Self::new(PlatformAuthConfig::from_env()?)
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Authenticate the raw `Authorization` header value.
    pub async fn authenticate(&self, authorization: Option<&str>) -> AuthResult<AuthUser> {
        let token = authorization
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .ok_or_else(|| AuthError::unauthorized("Missing or invalid Authorization header"))?;

        let claims = self.verifier.verify_token(token).await?;
        let mut user = AuthUser::from_claims(claims)?;
        user.verified = self.verification_status(&user.identity).await;

        if self.require_verification && !user.verified {
            return Err(AuthError::forbidden("Verification required"));
        }

        debug!(identity = %user.identity, verified = user.verified, "caller authenticated");
        Ok(user)
    }

    /// Best effort: any lookup failure reads as unverified.
    async fn verification_status(&self, identity: &str) -> bool {
        let Some(api) = &self.api else {
            return false;
        };

        match api.get(&format!("/auth/status/{}", identity)).await {
            Ok(status) => ["kyc_verified", "kycVerified"]
                .iter()
                .any(|field| status.get(*field).and_then(Value::as_bool) == Some(true)),
            Err(e) => {
                warn!(identity, error = %e, "verification status lookup failed");
                false
            }
        }
    }
}

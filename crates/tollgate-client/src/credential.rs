//! Partner credential exchange and the cached bearer credential.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ApiClientError, ClientResult};

/// A credential is treated as expired this long before its actual expiry.
pub const CLOCK_SKEW_BUFFER_SECS: i64 = 30;

/// Longest credential lifetime accepted from the exchange (one year).
const MAX_EXPIRES_IN_SECS: f64 = 31_536_000.0;

/// Request body for `POST /partner/auth`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PartnerAuthRequest<'a> {
    pub partner_id: &'a str,
    pub partner_secret: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartnerAuthResponse {
    token: String,
    /// Lifetime in seconds.
    expires_in: f64,
}

#[derive(Clone)]
pub(crate) struct CachedCredential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for CachedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedCredential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CachedCredential {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Duration::seconds(CLOCK_SKEW_BUFFER_SECS)
    }
}

/// Parse a successful exchange response into a credential.
///
/// A body the client cannot use is an authentication failure, not a parse error:
/// without a token no request can proceed.
pub(crate) fn parse_exchange(status: u16, body: &str) -> ClientResult<CachedCredential> {
    if status >= 400 {
        return Err(ApiClientError::auth_failed(status));
    }
    let parsed: PartnerAuthResponse =
        serde_json::from_str(body).map_err(|_| ApiClientError::auth_failed(status))?;
    if parsed.token.is_empty() || !(0.0..=MAX_EXPIRES_IN_SECS).contains(&parsed.expires_in) {
        return Err(ApiClientError::auth_failed(status));
    }
    let expires_at = TimeDelta::try_milliseconds((parsed.expires_in * 1000.0) as i64)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| ApiClientError::auth_failed(status))?;
    Ok(CachedCredential {
        access_token: parsed.token,
        expires_at,
    })
}

/// Instance-scoped credential slot shared by clones of one client.
#[derive(Clone, Default)]
pub(crate) struct CredentialCache {
    slot: Arc<RwLock<Option<CachedCredential>>>,
}

impl CredentialCache {
    /// Token of the cached credential when it is still fresh.
    pub fn current(&self) -> Option<String> {
        let guard = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|c| c.is_fresh(Utc::now()))
            .map(|c| c.access_token.clone())
    }

    pub fn store(&self, credential: CachedCredential) {
        let mut guard = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(credential);
    }

    pub fn clear(&self) {
        let mut guard = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }
}

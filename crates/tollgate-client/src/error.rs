//! Error types for the authority API client.

/// Stable error codes carried by [`ApiClientError`].
///
/// Codes returned by the remote API in an error body are passed through
/// verbatim; these are the ones the client itself produces.
pub mod codes {
    /// Partner credential exchange was rejected.
    pub const AUTH_FAILED: &str = "AUTH_FAILED";
    /// Error status without a usable error body.
    pub const UNKNOWN: &str = "UNKNOWN";
    /// Success status but the body is not JSON.
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    /// The remote endpoint could not be reached.
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    /// Client construction failed (TLS material, builder).
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
}

/// Error surfaced by every [`crate::ApiClient`] operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiClientError {
    pub message: String,
    pub code: String,
    /// HTTP status of the failing response; `None` when no response arrived.
    pub status: Option<u16>,
}

impl ApiClientError {
    pub fn new(message: impl Into<String>, code: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            status,
        }
    }

    pub fn auth_failed(status: u16) -> Self {
        Self::new("Authentication failed", codes::AUTH_FAILED, Some(status))
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(message, codes::NETWORK_ERROR, None)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(message, codes::CONFIG_ERROR, None)
    }

    /// Whether the failure happened before any response was received.
    pub fn is_transport(&self) -> bool {
        self.code == codes::NETWORK_ERROR
    }
}

impl From<reqwest::Error> for ApiClientError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            message: format!("network error: {}", err),
            code: codes::NETWORK_ERROR.to_string(),
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ApiClientError>;

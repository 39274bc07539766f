use tollgate_client::ApiClientError;

/// Why no authorization decision could be obtained.
///
/// Every variant blocks the action with an `ERROR` rejection.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Authority(#[from] ApiClientError),

    /// The authority answered with something other than a valid verdict.
    #[error("invalid authority response: {message}")]
    Protocol { message: String },
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol {
            message: err.to_string(),
        }
    }
}

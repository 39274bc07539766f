//! Authentication and authorization failures.

/// Failure carrying an HTTP-like status for the boundary layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Missing, malformed, expired or otherwise unverifiable credentials.
    #[error("{message}")]
    Unauthorized { message: String },

    /// Authenticated but not permitted.
    #[error("{message}")]
    Forbidden { message: String },

    /// The identity provider answered with an error or an unusable document.
    #[error("{message}")]
    Provider { status: u16, message: String },

    /// The identity provider could not be reached.
    #[error("{message}")]
    Transport { message: String },

    #[error("{message}")]
    Config { message: String },
}

impl AuthError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::Provider { status, .. } => *status,
            Self::Transport { .. } => 503,
            Self::Config { .. } => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::Provider { message, .. }
            | Self::Transport { message }
            | Self::Config { message } => message,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: format!("identity provider unreachable: {}", err),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

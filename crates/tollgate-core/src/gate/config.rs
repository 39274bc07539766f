//! Gate configuration.

use serde::{Deserialize, Serialize};
use tollgate_client::{ApiClientError, ClientConfig, ClientResult};

pub const DEFAULT_AUTHORITY_ENDPOINT: &str = "/authority/evaluate";

fn default_authority_endpoint() -> String {
    DEFAULT_AUTHORITY_ENDPOINT.to_string()
}

/// Identity of the acting agent plus the authority API connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(flatten)]
    pub client: ClientConfig,

    pub agent_id: String,

    pub controller_id: String,

    pub delegation_id: String,

    /// Path of the evaluation endpoint, appended to the API URL.
    #[serde(default = "default_authority_endpoint")]
    pub authority_endpoint: String,
}

impl GateConfig {
    pub fn new(
        client: ClientConfig,
        agent_id: impl Into<String>,
        controller_id: impl Into<String>,
        delegation_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            agent_id: agent_id.into(),
            controller_id: controller_id.into(),
            delegation_id: delegation_id.into(),
            authority_endpoint: default_authority_endpoint(),
        }
    }

    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `TOLLGATE_AGENT_ID` | Acting agent |
    /// | `TOLLGATE_CONTROLLER_ID` | Controller the agent acts for |
    /// | `TOLLGATE_DELEGATION_ID` | Delegation grant in effect |
    /// | `TOLLGATE_AUTHORITY_ENDPOINT` | Evaluation path (default: `/authority/evaluate`) |
    ///
    /// Connection settings are read by [`ClientConfig::from_env`].
    pub fn from_env() -> ClientResult<Self> {
        let required = |name: &str| {
            std::env::var(name).map_err(|_| ApiClientError::config(format!("{} not set", name)))
        };
        Ok(Self {
            client: ClientConfig::from_env()?,
            agent_id: required("TOLLGATE_AGENT_ID")?,
            controller_id: required("TOLLGATE_CONTROLLER_ID")?,
            delegation_id: required("TOLLGATE_DELEGATION_ID")?,
            authority_endpoint: std::env::var("TOLLGATE_AUTHORITY_ENDPOINT")
                .unwrap_or_else(|_| default_authority_endpoint()),
        })
    }

    pub fn with_authority_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.authority_endpoint = endpoint.into();
        self
    }
}

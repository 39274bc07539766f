//! Partner-authenticated HTTP client for the Tollgate authority API.
//!
//! # Example
//!
//! ```no_run
//! use tollgate_client::{ApiClient, ClientConfig};
//!
//! # async fn example() -> tollgate_client::ClientResult<()> {
//! let client = ApiClient::new(ClientConfig::new(
//!     "https://api.tollgate.dev",
//!     "partner-id",
//!     "partner-secret",
//! ))?;
//! let agent = client.get("/agents/agent-1").await?;
//! # let _ = agent;
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `TOLLGATE_API_URL` | API base URL |
//! | `TOLLGATE_PARTNER_ID` | Partner identifier |
//! | `TOLLGATE_PARTNER_SECRET` | Partner secret |
//! | `TOLLGATE_CA_CERT` | PEM CA bundle trusted for every outbound call |
//! | `TOLLGATE_VERIFY_SSL` | `false` disables certificate verification |

mod client;
pub mod config;
mod credential;
pub mod error;

pub use client::ApiClient;
pub use config::{ClientConfig, TlsConfig};
pub use credential::CLOCK_SKEW_BUFFER_SECS;
pub use error::{codes, ApiClientError, ClientResult};

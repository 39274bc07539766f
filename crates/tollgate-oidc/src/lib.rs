//! OIDC bearer token verification and authorization helpers.
//!
//! [`TokenVerifier`] validates signed tokens against the issuer's published
//! keys and falls back to the userinfo endpoint for opaque tokens. Discovery
//! documents and key sets are cached per issuer for `jwks_cache_ttl`.
//!
//! # Example
//!
//! ```no_run
//! use tollgate_oidc::{TokenVerifier, VerifierConfig};
//!
//! # async fn example(token: &str) -> tollgate_oidc::AuthResult<()> {
//! let verifier = TokenVerifier::new(
//!     VerifierConfig::new("https://id.example.com").with_audience("tollgate"),
//! )?;
//! let claims = verifier.verify_token(token).await?;
//! println!("caller: {}", claims["sub"]);
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `TOLLGATE_OIDC_ISSUER_URL` | Issuer URL (required) |
//! | `TOLLGATE_OIDC_AUDIENCE` | Expected audience |
//! | `TOLLGATE_JWKS_CACHE_TTL` | Discovery/JWKS cache lifetime in seconds |
//! | `TOLLGATE_API_URL`, `TOLLGATE_PARTNER_ID`, `TOLLGATE_PARTNER_SECRET` | Enables verification-status enrichment (`platform` feature) |

pub mod authorization;
mod cache;
pub mod config;
pub mod error;
mod jwks;
#[cfg(feature = "platform")]
pub mod platform;
mod verifier;

pub use authorization::{
    apply_rules, ownership_filter, require_scopes, require_verified, AuthUser, AuthorizationRule,
};
pub use cache::{DiscoveryDocument, VerifierCache};
pub use config::VerifierConfig;
pub use error::{AuthError, AuthResult};
#[cfg(feature = "platform")]
pub use platform::{PlatformAuth, PlatformAuthConfig};
pub use verifier::{Claims, TokenVerifier};

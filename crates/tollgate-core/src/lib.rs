//! Pre-execution authority gate for agent actions.
//!
//! [`AuthorityGate`] asks the authority service for a verdict before every
//! action, runs the action only on `ALLOW`, and records a [`ProofArtifact`]
//! binding the actor, the action and the digests of its parameters and result.
//!
//! ```no_run
//! use tollgate_core::{ActionRequest, ActionResponse, AuthorityGate, GateConfig};
//!
//! # async fn example() -> tollgate_client::ClientResult<()> {
//! let gate = AuthorityGate::new(GateConfig::from_env()?)?
//!     .with_proof_sink(|proof: &tollgate_core::ProofArtifact| {
//!         println!("proof {}", proof.proof_id);
//!     });
//!
//! let request = ActionRequest::new("search", serde_json::Map::new(), "call-1");
//! let response = gate
//!     .wrap_action(request, &|req: ActionRequest| async move {
//!         ActionResponse::new(req.correlation_id, "results")
//!     })
//!     .await;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

pub mod gate;
pub mod hash;
pub mod types;

pub use gate::{
    ActionHandler, ActionState, AsyncActionHandler, AuthorityGate, GateConfig, GateError,
    IntentResolver, ProofSink, DEFAULT_AUTHORITY_ENDPOINT,
};
pub use hash::{hash_parameters, hash_result};
pub use types::{
    ActionContext, ActionRequest, ActionResponse, AuthorityDecision, EvaluationRequest,
    EvaluationResponse, GateRejection, ProofArtifact, RejectionStatus,
};

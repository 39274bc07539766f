//! Pre-execution authority gate.
//!
//! Every action passes through one authority evaluation before it may run:
//!
//! ```text
//! Received -> Evaluating -> Executing -> Completed
//!                       \-> Denied
//!                       \-> Errored
//! ```
//!
//! Any failure to obtain a verdict blocks the action (fail-closed). Exactly one
//! [`ProofArtifact`] is recorded per action that actually executed.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, error, info};
use tollgate_client::{ApiClient, ClientResult};

use crate::hash::{hash_parameters, hash_result};
use crate::types::{
    ActionContext, ActionRequest, ActionResponse, AuthorityDecision, EvaluationRequest,
    EvaluationResponse, GateRejection, ProofArtifact,
};

mod config;
mod error;
mod handler;

pub use config::{GateConfig, DEFAULT_AUTHORITY_ENDPOINT};
pub use error::GateError;
pub use handler::{ActionHandler, AsyncActionHandler, IntentResolver, ProofSink};

/// Lifecycle of a single action through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Received,
    Evaluating,
    Executing,
    Completed,
    Denied,
    Errored,
}

impl ActionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Denied | Self::Errored)
    }
}

fn transition(tool: &str, correlation_id: &str, state: ActionState) {
    debug!(tool = %tool, correlation_id = %correlation_id, state = ?state, "action state");
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Authority gate wrapping action execution.
pub struct AuthorityGate {
    config: GateConfig,
    client: ApiClient,
    proofs: Mutex<Vec<ProofArtifact>>,
    proof_sink: Option<Arc<dyn ProofSink>>,
    intent_resolver: Option<Arc<dyn IntentResolver>>,
}

impl fmt::Debug for AuthorityGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorityGate")
            .field("config", &self.config)
            .field("proof_sink", &self.proof_sink.is_some())
            .field("intent_resolver", &self.intent_resolver.is_some())
            .finish_non_exhaustive()
    }
}

impl AuthorityGate {
    pub fn new(config: GateConfig) -> ClientResult<Self> {
        let client = ApiClient::new(config.client.clone())?;
        Ok(Self::with_client(config, client))
    }

    /// Use an existing client (and its cached credential) for evaluations.
    pub fn with_client(config: GateConfig, client: ApiClient) -> Self {
        Self {
            config,
            client,
            proofs: Mutex::new(Vec::new()),
            proof_sink: None,
            intent_resolver: None,
        }
    }

    pub fn from_env() -> ClientResult<Self> {
        Self::new(GateConfig::from_env()?)
    }

    pub fn with_proof_sink(mut self, sink: impl ProofSink + 'static) -> Self {
        self.proof_sink = Some(Arc::new(sink));
        self
    }

    pub fn with_intent_resolver(mut self, resolver: impl IntentResolver + 'static) -> Self {
        self.intent_resolver = Some(Arc::new(resolver));
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Snapshot of all proofs recorded so far, in completion order.
    pub fn proofs(&self) -> Vec<ProofArtifact> {
        self.proofs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Evaluate `request` and run `handler` only on `ALLOW`.
    pub async fn wrap_action<H>(&self, request: ActionRequest, handler: &H) -> ActionResponse
    where
        H: AsyncActionHandler + ?Sized,
    {
        let tool = request.action_name.clone();
        let correlation_id = request.correlation_id.clone();
        transition(&tool, &correlation_id, ActionState::Received);

        let evaluation = self.build_evaluation(&request);
        transition(&tool, &correlation_id, ActionState::Evaluating);
        let started = Instant::now();

        let outcome = match serde_json::to_value(&evaluation) {
            Ok(body) => self
                .client
                .post(&self.config.authority_endpoint, Some(&body))
                .await
                .map_err(GateError::from),
            Err(e) => Err(GateError::from(e)),
        };
        let verdict = match self.decide(&tool, &correlation_id, outcome) {
            Ok(verdict) => verdict,
            Err(rejection) => return rejection,
        };

        transition(&tool, &correlation_id, ActionState::Executing);
        let result = handler.call(request).await;
        transition(&tool, &correlation_id, ActionState::Completed);

        self.record(&evaluation, verdict, &result, started);
        result
    }

    /// Blocking form of [`AuthorityGate::wrap_action`].
    ///
    /// Must not be called from inside an async runtime.
    pub fn wrap_action_blocking<H>(&self, request: ActionRequest, handler: &H) -> ActionResponse
    where
        H: ActionHandler + ?Sized,
    {
        let tool = request.action_name.clone();
        let correlation_id = request.correlation_id.clone();
        transition(&tool, &correlation_id, ActionState::Received);

        let evaluation = self.build_evaluation(&request);
        transition(&tool, &correlation_id, ActionState::Evaluating);
        let started = Instant::now();

        let outcome = match serde_json::to_value(&evaluation) {
            Ok(body) => self
                .client
                .post_blocking(&self.config.authority_endpoint, Some(&body))
                .map_err(GateError::from),
            Err(e) => Err(GateError::from(e)),
        };
        let verdict = match self.decide(&tool, &correlation_id, outcome) {
            Ok(verdict) => verdict,
            Err(rejection) => return rejection,
        };

        transition(&tool, &correlation_id, ActionState::Executing);
        let result = handler.call(request);
        transition(&tool, &correlation_id, ActionState::Completed);

        self.record(&evaluation, verdict, &result, started);
        result
    }

    fn build_evaluation(&self, request: &ActionRequest) -> EvaluationRequest {
        let intent = self
            .intent_resolver
            .as_ref()
            .and_then(|r| r.resolve(&request.action_name, &request.arguments));

        EvaluationRequest {
            agent_id: self.config.agent_id.clone(),
            controller_id: self.config.controller_id.clone(),
            delegation_id: self.config.delegation_id.clone(),
            action: ActionContext {
                tool: request.action_name.clone(),
                target: request.target(),
                parameters_hash: hash_parameters(&request.arguments),
                intent,
                timestamp: now_iso8601(),
            },
        }
    }

    /// `Ok` only for a well-formed `ALLOW`; everything else becomes the
    /// rejection response returned to the caller.
    fn decide(
        &self,
        tool: &str,
        correlation_id: &str,
        outcome: Result<Value, GateError>,
    ) -> Result<EvaluationResponse, ActionResponse> {
        let verdict = outcome.and_then(|raw| {
            serde_json::from_value::<EvaluationResponse>(raw).map_err(GateError::from)
        });

        match verdict {
            Ok(v) if v.decision == AuthorityDecision::Allow => {
                info!(tool = %tool, proof_id = %v.proof_id, "ALLOW");
                Ok(v)
            }
            Ok(v) => {
                info!(tool = %tool, reason_code = ?v.reason_code, "DENY");
                transition(tool, correlation_id, ActionState::Denied);
                Err(GateRejection::denied(tool, &v).into_response(correlation_id))
            }
            Err(e) => {
                error!(tool = %tool, error = %e, "authority evaluation failed");
                transition(tool, correlation_id, ActionState::Errored);
                Err(GateRejection::error(tool, &e).into_response(correlation_id))
            }
        }
    }

    fn record(
        &self,
        evaluation: &EvaluationRequest,
        verdict: EvaluationResponse,
        result: &ActionResponse,
        started: Instant,
    ) {
        let proof = ProofArtifact {
            proof_id: verdict.proof_id,
            agent_id: evaluation.agent_id.clone(),
            controller_id: evaluation.controller_id.clone(),
            delegation_id: evaluation.delegation_id.clone(),
            tool: evaluation.action.tool.clone(),
            parameters_hash: evaluation.action.parameters_hash.clone(),
            result_hash: hash_result(&result.content),
            authority_signature: verdict.signature,
            timestamp: now_iso8601(),
            latency_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        debug!(proof_id = %proof.proof_id, latency_ms = proof.latency_ms, "proof recorded");

        self.proofs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(proof.clone());

        if let Some(sink) = &self.proof_sink {
            sink.emit(&proof);
        }
    }
}

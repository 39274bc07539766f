//! Capabilities injected into the gate: the wrapped action and the callbacks.

use std::future::Future;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::types::{ActionRequest, ActionResponse, ProofArtifact};

/// Executes an action on a blocking thread.
pub trait ActionHandler: Send + Sync {
    fn call(&self, request: ActionRequest) -> ActionResponse;
}

impl<F> ActionHandler for F
where
    F: Fn(ActionRequest) -> ActionResponse + Send + Sync,
{
    fn call(&self, request: ActionRequest) -> ActionResponse {
        self(request)
    }
}

/// Executes an action cooperatively.
#[async_trait]
pub trait AsyncActionHandler: Send + Sync {
    async fn call(&self, request: ActionRequest) -> ActionResponse;
}

#[async_trait]
impl<F, Fut> AsyncActionHandler for F
where
    F: Fn(ActionRequest) -> Fut + Send + Sync,
    Fut: Future<Output = ActionResponse> + Send,
{
    async fn call(&self, request: ActionRequest) -> ActionResponse {
        self(request).await
    }
}

/// Receives every proof artifact right after it is recorded.
///
/// Called inline on the action's flow, once per artifact.
pub trait ProofSink: Send + Sync {
    fn emit(&self, proof: &ProofArtifact);
}

impl<F> ProofSink for F
where
    F: Fn(&ProofArtifact) + Send + Sync,
{
    fn emit(&self, proof: &ProofArtifact) {
        self(proof)
    }
}

/// Derives a free-text intent for an action from its name and arguments.
pub trait IntentResolver: Send + Sync {
    fn resolve(&self, action_name: &str, arguments: &Map<String, Value>) -> Option<String>;
}

impl<F> IntentResolver for F
where
    F: Fn(&str, &Map<String, Value>) -> Option<String> + Send + Sync,
{
    fn resolve(&self, action_name: &str, arguments: &Map<String, Value>) -> Option<String> {
        self(action_name, arguments)
    }
}

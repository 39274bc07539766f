//! Wire types exchanged with the authority service and emitted by the gate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Describes the action being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionContext {
    pub tool: String,
    /// The `target` argument when present, else the tool name.
    pub target: String,
    pub parameters_hash: String,
    pub intent: Option<String>,
    /// ISO 8601 UTC.
    pub timestamp: String,
}

/// Body of `POST {authority_endpoint}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub agent_id: String,
    pub controller_id: String,
    pub delegation_id: String,
    pub action: ActionContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthorityDecision {
    Allow,
    Deny,
}

/// Authority verdict. Deserialization fails for any decision other than
/// `ALLOW`/`DENY` and when `proof_id` or `signature` is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    pub decision: AuthorityDecision,
    pub proof_id: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
}

/// Record of one authorized and executed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofArtifact {
    pub proof_id: String,
    pub agent_id: String,
    pub controller_id: String,
    pub delegation_id: String,
    pub tool: String,
    pub parameters_hash: String,
    pub result_hash: String,
    pub authority_signature: String,
    /// ISO 8601 UTC.
    pub timestamp: String,
    pub latency_ms: f64,
}

/// An action invocation presented to the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action_name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    pub correlation_id: String,
}

impl ActionRequest {
    pub fn new(
        action_name: impl Into<String>,
        arguments: Map<String, Value>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            action_name: action_name.into(),
            arguments,
            correlation_id: correlation_id.into(),
        }
    }

    /// `arguments.target` rendered as a string, falling back to the action name.
    pub fn target(&self) -> String {
        match self.arguments.get("target") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => self.action_name.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Result of an action, or the gate's rejection payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub correlation_id: String,
    pub content: String,
}

impl ActionResponse {
    pub fn new(correlation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RejectionStatus {
    Denied,
    Error,
}

/// JSON payload placed in [`ActionResponse::content`] when the gate blocks an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRejection {
    pub status: RejectionStatus,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_id: Option<String>,
    pub message: String,
}

impl GateRejection {
    pub fn denied(tool: &str, response: &EvaluationResponse) -> Self {
        let mut message = format!("Authority check denied execution of '{}'", tool);
        if let Some(reason) = &response.reason_code {
            message.push_str(": ");
            message.push_str(reason);
        }
        Self {
            status: RejectionStatus::Denied,
            tool: tool.to_string(),
            reason_code: response.reason_code.clone(),
            proof_id: Some(response.proof_id.clone()),
            message,
        }
    }

    pub fn error(tool: &str, cause: impl std::fmt::Display) -> Self {
        Self {
            status: RejectionStatus::Error,
            tool: tool.to_string(),
            reason_code: None,
            proof_id: None,
            message: format!("Authority evaluation failed: {}", cause),
        }
    }

    pub fn into_response(self, correlation_id: &str) -> ActionResponse {
        // Plain data with string keys; serialization cannot fail.
        let content = serde_json::to_string(&self).unwrap_or_default();
        ActionResponse::new(correlation_id, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_decision_rejected() {
        let raw = json!({"decision": "MAYBE", "proof_id": "p", "signature": "s"});
        assert!(serde_json::from_value::<EvaluationResponse>(raw).is_err());
    }

    #[test]
    fn test_missing_signature_rejected() {
        let raw = json!({"decision": "ALLOW", "proof_id": "p"});
        assert!(serde_json::from_value::<EvaluationResponse>(raw).is_err());
    }

    #[test]
    fn test_deny_parses_reason() {
        let raw = json!({
            "decision": "DENY",
            "proof_id": "p2",
            "signature": "s2",
            "reason_code": "POLICY_VIOLATION"
        });
        let response: EvaluationResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.decision, AuthorityDecision::Deny);
        assert_eq!(response.reason_code.as_deref(), Some("POLICY_VIOLATION"));
    }

    #[test]
    fn test_target_resolution() {
        let with_target = ActionRequest::new(
            "transfer",
            json!({"target": "acct-9"}).as_object().cloned().unwrap(),
            "c1",
        );
        assert_eq!(with_target.target(), "acct-9");

        let numeric = ActionRequest::new(
            "transfer",
            json!({"target": 42}).as_object().cloned().unwrap(),
            "c1",
        );
        assert_eq!(numeric.target(), "42");

        let without = ActionRequest::new("search", Map::new(), "c2");
        assert_eq!(without.target(), "search");
    }

    #[test]
    fn test_denied_payload_shape() {
        let response = EvaluationResponse {
            decision: AuthorityDecision::Deny,
            proof_id: "p2".into(),
            signature: "s2".into(),
            reason_code: Some("POLICY_VIOLATION".into()),
        };
        let payload: Value =
            serde_json::from_str(&GateRejection::denied("transfer", &response).into_response("c").content)
                .unwrap();
        assert_eq!(
            payload,
            json!({
                "status": "DENIED",
                "tool": "transfer",
                "reason_code": "POLICY_VIOLATION",
                "proof_id": "p2",
                "message": "Authority check denied execution of 'transfer': POLICY_VIOLATION"
            })
        );
    }

    #[test]
    fn test_error_payload_omits_optional_fields() {
        let payload: Value = serde_json::from_str(
            &GateRejection::error("transfer", "connection refused")
                .into_response("c")
                .content,
        )
        .unwrap();
        assert_eq!(
            payload,
            json!({
                "status": "ERROR",
                "tool": "transfer",
                "message": "Authority evaluation failed: connection refused"
            })
        );
    }
}

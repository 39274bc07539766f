//! Response interpretation.
//!
//! This is the ONLY place for status code handling of API responses; the
//! partner exchange has its own rule in credential.rs.

use serde_json::Value;

use crate::error::{codes, ApiClientError, ClientResult};

/// Map a status and raw body to the parsed JSON body or a typed error.
pub(crate) fn interpret(status: u16, body: &str) -> ClientResult<Value> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    match (status >= 400, parsed) {
        (false, Some(value)) => Ok(value),
        (false, None) => Err(ApiClientError::new(
            "Invalid JSON response",
            codes::PARSE_ERROR,
            Some(status),
        )),
        (true, None) => Err(ApiClientError::new(
            format!("Request failed with status {}", status),
            codes::UNKNOWN,
            Some(status),
        )),
        (true, Some(value)) => {
            let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_owned);
            Err(ApiClientError::new(
                field("message").unwrap_or_else(|| "Request failed".to_string()),
                field("code").unwrap_or_else(|| codes::UNKNOWN.to_string()),
                Some(status),
            ))
        }
    }
}

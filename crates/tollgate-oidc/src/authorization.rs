//! Authorization rules over an authenticated identity.
//!
//! Rules take the value being authorized and either pass it on (possibly
//! rewritten) or reject with a 403. They compose by sequential application:
//!
//! ```
//! use serde_json::json;
//! use tollgate_oidc::authorization::{apply_rules, ownership_filter, require_scopes, AuthUser};
//!
//! let user = AuthUser::new("user-42").with_scopes(["threads:write"]);
//! let value = apply_rules(
//!     &[&require_scopes(["threads:write"]), &ownership_filter()],
//!     &user,
//!     json!({"title": "x"}),
//! )
//! .unwrap();
//! assert_eq!(value, json!({"title": "x", "owner": "user-42"}));
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AuthError, AuthResult};
use crate::verifier::Claims;

/// Identity context established by authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Subject identifier.
    pub identity: String,
    pub is_authenticated: bool,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// Identity verification (KYC) status.
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub claims: Claims,
}

/// `scope` as a space-separated string or an array of strings.
fn scopes_from(claims: &Claims) -> Vec<String> {
    match claims.get("scope") {
        Some(Value::String(s)) => s.split_whitespace().map(str::to_owned).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

impl AuthUser {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            is_authenticated: true,
            permissions: Vec::new(),
            scopes: Vec::new(),
            email: None,
            name: None,
            given_name: None,
            family_name: None,
            verified: false,
            claims: Claims::new(),
        }
    }

    /// Build the identity context from verified claims.
    pub fn from_claims(claims: Claims) -> AuthResult<Self> {
        let identity = match claims.get("sub") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => {
                return Err(AuthError::unauthorized("Token missing required 'sub' claim"))
            }
            Some(other) => other.to_string(),
        };
        let text = |field: &str| claims.get(field).and_then(Value::as_str).map(str::to_owned);

        let scopes = scopes_from(&claims);
        Ok(Self {
            identity,
            is_authenticated: true,
            permissions: scopes.clone(),
            scopes,
            email: text("email"),
            name: text("name"),
            given_name: text("given_name"),
            family_name: text("family_name"),
            verified: false,
            claims,
        })
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self.permissions = self.scopes.clone();
        self
    }

    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// A check applied to an authenticated user and the value being authorized.
pub trait AuthorizationRule: Send + Sync {
    fn apply(&self, user: &AuthUser, value: Value) -> AuthResult<Value>;
}

impl<F> AuthorizationRule for F
where
    F: Fn(&AuthUser, Value) -> AuthResult<Value> + Send + Sync,
{
    fn apply(&self, user: &AuthUser, value: Value) -> AuthResult<Value> {
        self(user, value)
    }
}

#[derive(Debug, Clone)]
pub struct RequireScopes {
    required: BTreeSet<String>,
}

/// Every listed scope must be granted.
pub fn require_scopes<I, S>(scopes: I) -> RequireScopes
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    RequireScopes {
        required: scopes.into_iter().map(Into::into).collect(),
    }
}

impl AuthorizationRule for RequireScopes {
    fn apply(&self, user: &AuthUser, value: Value) -> AuthResult<Value> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|s| !user.has_scope(s))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(value)
        } else {
            // BTreeSet iteration is already sorted.
            Err(AuthError::forbidden(format!(
                "Missing required scopes: {}",
                missing.join(", ")
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequireVerified;

/// The user's identity must be verified.
pub fn require_verified() -> RequireVerified {
    RequireVerified
}

impl AuthorizationRule for RequireVerified {
    fn apply(&self, user: &AuthUser, value: Value) -> AuthResult<Value> {
        if user.verified {
            Ok(value)
        } else {
            Err(AuthError::forbidden("Verification required for this operation"))
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipFilter;

/// Tag objects with `owner`; replace anything else with an `{owner}` filter.
pub fn ownership_filter() -> OwnershipFilter {
    OwnershipFilter
}

impl AuthorizationRule for OwnershipFilter {
    fn apply(&self, user: &AuthUser, value: Value) -> AuthResult<Value> {
        match value {
            Value::Object(mut map) => {
                map.insert("owner".to_string(), Value::String(user.identity.clone()));
                Ok(Value::Object(map))
            }
            _ => Ok(json!({ "owner": user.identity })),
        }
    }
}

/// Apply `rules` in order, feeding each rule's output to the next.
pub fn apply_rules(
    rules: &[&dyn AuthorizationRule],
    user: &AuthUser,
    value: Value,
) -> AuthResult<Value> {
    rules
        .iter()
        .try_fold(value, |value, rule| rule.apply(user, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthUser {
        AuthUser::new("user-42")
    }

    #[test]
    fn test_ownership_filter_tags_objects() {
        let out = ownership_filter()
            .apply(&user(), json!({"title": "x"}))
            .unwrap();
        assert_eq!(out, json!({"title": "x", "owner": "user-42"}));
    }

    #[test]
    fn test_ownership_filter_overrides_supplied_owner() {
        let out = ownership_filter()
            .apply(&user(), json!({"owner": "someone-else"}))
            .unwrap();
        assert_eq!(out, json!({"owner": "user-42"}));
    }

    #[test]
    fn test_ownership_filter_non_object_becomes_filter() {
        for value in [Value::Null, json!("thread-1"), json!([1, 2])] {
            let out = ownership_filter().apply(&user(), value).unwrap();
            assert_eq!(out, json!({"owner": "user-42"}));
        }
    }

    #[test]
    fn test_require_scopes_reports_missing_sorted() {
        let user = user().with_scopes(["email"]);
        let err = require_scopes(["profile", "email", "admin"])
            .apply(&user, json!({}))
            .unwrap_err();
        assert_eq!(err.status(), 403);
        assert_eq!(err.message(), "Missing required scopes: admin, profile");
    }

    #[test]
    fn test_require_scopes_passes_value_through() {
        let user = user().with_scopes(["email", "profile"]);
        let out = require_scopes(["email"])
            .apply(&user, json!({"k": 1}))
            .unwrap();
        assert_eq!(out, json!({"k": 1}));
    }

    #[test]
    fn test_require_verified() {
        let err = require_verified().apply(&user(), json!({})).unwrap_err();
        assert_eq!(err.status(), 403);
        assert_eq!(err.message(), "Verification required for this operation");

        let ok = require_verified()
            .apply(&user().with_verified(true), json!(1))
            .unwrap();
        assert_eq!(ok, json!(1));
    }

    #[test]
    fn test_apply_rules_stops_at_first_failure() {
        let deny_all = |_: &AuthUser, _: Value| -> AuthResult<Value> {
            Err(AuthError::forbidden("closed"))
        };
        let err = apply_rules(
            &[&ownership_filter(), &deny_all, &require_verified()],
            &user(),
            json!({}),
        )
        .unwrap_err();
        assert_eq!(err.message(), "closed");
    }

    #[test]
    fn test_from_claims() {
        let claims = json!({
            "sub": "user-42",
            "scope": "openid email",
            "email": "u@example.com",
            "name": "U",
            "iss": "https://id.example.com"
        });
        let user = AuthUser::from_claims(claims.as_object().cloned().unwrap()).unwrap();
        assert_eq!(user.identity, "user-42");
        assert_eq!(user.scopes, vec!["openid", "email"]);
        assert_eq!(user.permissions, user.scopes);
        assert_eq!(user.email.as_deref(), Some("u@example.com"));
        assert!(user.given_name.is_none());
        assert!(!user.verified);
        assert_eq!(user.claims["iss"], "https://id.example.com");
    }

    #[test]
    fn test_from_claims_scope_array() {
        let claims = json!({"sub": 7, "scope": ["a", "b", 3]});
        let user = AuthUser::from_claims(claims.as_object().cloned().unwrap()).unwrap();
        assert_eq!(user.identity, "7");
        assert_eq!(user.scopes, vec!["a", "b"]);
    }

    #[test]
    fn test_from_claims_requires_sub() {
        let err = AuthUser::from_claims(Claims::new()).unwrap_err();
        assert_eq!(err.status(), 401);
    }
}

//! JWT claims and the verified principal.
//!
//! `Claims` is the deserialization target for token payloads during
//! verification; `Principal` is what the rest of the service sees. The
//! subject and email are redacted in Debug output to keep identifiers out
//! of logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Claims carried by a provider-issued access token.
///
/// Only the claims the service reads are modeled; audience and issuer are
/// validated against the raw payload by the verifier.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user identifier). Optional here so that its absence can be
    /// classified separately from a malformed token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// User email, when the provider includes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Provider role (e.g. "authenticated").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("exp", &self.exp)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("role", &self.role)
            .finish()
    }
}

/// The verified identity extracted from a token.
///
/// Constructed only after successful verification; lives for the duration
/// of one request. The `user_id` is the row-ownership key for all data
/// access.
#[derive(Clone)]
pub struct Principal {
    /// Subject identifier. Always non-empty.
    pub user_id: String,

    /// User email, if present in the token.
    pub email: Option<String>,

    /// Provider role, if present in the token.
    pub role: Option<String>,
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("user_id", &"[REDACTED]")
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("role", &self.role)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_debug_redacts_identifiers() {
        let claims = Claims {
            sub: Some("5f8b1e9a-user-id".to_string()),
            exp: 1_700_000_000,
            email: Some("alice@example.com".to_string()),
            role: Some("authenticated".to_string()),
        };

        let debug_str = format!("{:?}", claims);

        assert!(!debug_str.contains("5f8b1e9a-user-id"));
        assert!(!debug_str.contains("alice@example.com"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("authenticated"));
    }

    #[test]
    fn test_principal_debug_redacts_identifiers() {
        let principal = Principal {
            user_id: "5f8b1e9a-user-id".to_string(),
            email: Some("alice@example.com".to_string()),
            role: None,
        };

        let debug_str = format!("{:?}", principal);

        assert!(!debug_str.contains("5f8b1e9a-user-id"));
        assert!(!debug_str.contains("alice@example.com"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_claims_deserialization_minimal() {
        let json = r#"{"exp": 1700000000}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();

        assert!(claims.sub.is_none());
        assert_eq!(claims.exp, 1_700_000_000);
        assert!(claims.email.is_none());
        assert!(claims.role.is_none());
    }

    #[test]
    fn test_claims_deserialization_ignores_unknown_fields() {
        let json = r#"{
            "sub": "user-1",
            "exp": 1700000000,
            "aud": "authenticated",
            "iss": "https://example.supabase.co/auth/v1",
            "session_id": "abc"
        }"#;
        let claims: Claims = serde_json::from_str(json).unwrap();

        assert_eq!(claims.sub.as_deref(), Some("user-1"));
    }
}

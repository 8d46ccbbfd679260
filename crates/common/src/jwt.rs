//! JWT utilities shared by the Buddhira backend.
//!
//! This module provides the pieces of token handling that do not require
//! signature verification:
//! - Size limits for DoS prevention
//! - Key ID (`kid`) extraction from JWT headers
//! - Log-only subject peeking for request correlation
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing here verifies a signature; callers MUST verify the token
//!   before trusting any claim
//! - `unverified_subject` exists solely so request logs can be correlated
//!   with a user; its output must never be used for authorization

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Typical access tokens are 300-900 bytes. Tokens larger than this are
/// rejected before any base64 decoding or cryptographic work happens, which
/// bounds the cost an attacker can impose with an oversized credential.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT header.
///
/// Messages are intentionally generic; the underlying cause is logged at
/// debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtHeaderError {
    /// Token size exceeds maximum allowed.
    #[error("Invalid token")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("Invalid token")]
    MalformedToken,

    /// Token is missing the required `kid` header.
    #[error("Invalid token")]
    MissingKid,
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// Used to select the correct public key from the provider's key set before
/// verification. The `kid` value must only be used for key lookup in a
/// trusted key set; the token itself still has to be verified afterwards.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - wrong structure, bad base64, or invalid header JSON
/// - `MissingKid` - header has no `kid`, or `kid` is empty / not a string
pub fn extract_kid(token: &str) -> Result<String, JwtHeaderError> {
    let header = decode_header_json(token)?;

    header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtHeaderError::MissingKid)
}

/// Extract the `sub` claim from a JWT payload WITHOUT verifying the signature.
///
/// For request-log correlation only. Returns `None` for anything that is not
/// shaped like a JWT with a string `sub` claim.
#[must_use]
pub fn unverified_subject(token: &str) -> Option<String> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        return None;
    }

    let payload_part = token.split('.').nth(1)?;
    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_part).ok()?;
    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes).ok()?;

    payload
        .get("sub")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Decode the header segment of a JWT into JSON, enforcing the size limit.
fn decode_header_json(token: &str) -> Result<serde_json::Value, JwtHeaderError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "buddhira.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtHeaderError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "buddhira.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtHeaderError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtHeaderError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "buddhira.jwt", error = %e, "Failed to decode JWT header base64");
        JwtHeaderError::MalformedToken
    })?;

    serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "buddhira.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtHeaderError::MalformedToken
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn token_with_header(header: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        format!("{header_b64}.payload.signature")
    }

    fn token_with_payload(payload: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(r#"{"alg":"ES256","typ":"JWT"}"#);
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        format!("{header_b64}.{payload_b64}.signature")
    }

    // -------------------------------------------------------------------------
    // extract_kid
    // -------------------------------------------------------------------------

    #[test]
    fn test_extract_kid_valid_token() {
        let token = token_with_header(r#"{"alg":"ES256","typ":"JWT","kid":"key-2024-01"}"#);
        assert_eq!(extract_kid(&token).unwrap(), "key-2024-01");
    }

    #[test]
    fn test_extract_kid_missing_kid() {
        let token = token_with_header(r#"{"alg":"ES256","typ":"JWT"}"#);
        assert!(matches!(
            extract_kid(&token),
            Err(JwtHeaderError::MissingKid)
        ));
    }

    #[test]
    fn test_extract_kid_empty_kid_rejected() {
        let token = token_with_header(r#"{"alg":"ES256","kid":""}"#);
        assert!(matches!(
            extract_kid(&token),
            Err(JwtHeaderError::MissingKid)
        ));
    }

    #[test]
    fn test_extract_kid_non_string_kid() {
        let token = token_with_header(r#"{"alg":"ES256","kid":12345}"#);
        assert!(matches!(
            extract_kid(&token),
            Err(JwtHeaderError::MissingKid)
        ));
    }

    #[test]
    fn test_extract_kid_malformed_token() {
        for bad in ["not-a-jwt", "only.two", "a.b.c.d", ""] {
            assert!(
                matches!(extract_kid(bad), Err(JwtHeaderError::MalformedToken)),
                "expected MalformedToken for {bad:?}"
            );
        }
    }

    #[test]
    fn test_extract_kid_invalid_base64() {
        let result = extract_kid("!!!invalid!!!.payload.signature");
        assert!(matches!(result, Err(JwtHeaderError::MalformedToken)));
    }

    #[test]
    fn test_extract_kid_invalid_json() {
        let header_b64 = URL_SAFE_NO_PAD.encode("not-json");
        let token = format!("{header_b64}.payload.signature");
        assert!(matches!(
            extract_kid(&token),
            Err(JwtHeaderError::MalformedToken)
        ));
    }

    #[test]
    fn test_extract_kid_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert!(matches!(
            extract_kid(&oversized),
            Err(JwtHeaderError::TokenTooLarge)
        ));
    }

    #[test]
    fn test_extract_kid_at_size_limit() {
        let header = r#"{"alg":"ES256","typ":"JWT","kid":"key"}"#;
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        let remaining = MAX_JWT_SIZE_BYTES - header_b64.len() - 2; // two dots
        let payload_len = remaining / 2;
        let sig_len = remaining - payload_len;
        let token = format!(
            "{}.{}.{}",
            header_b64,
            "a".repeat(payload_len),
            "b".repeat(sig_len)
        );
        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);

        assert_eq!(extract_kid(&token).unwrap(), "key");
    }

    // -------------------------------------------------------------------------
    // unverified_subject
    // -------------------------------------------------------------------------

    #[test]
    fn test_unverified_subject_present() {
        let token = token_with_payload(r#"{"sub":"user-123","exp":1700000000}"#);
        assert_eq!(unverified_subject(&token), Some("user-123".to_string()));
    }

    #[test]
    fn test_unverified_subject_absent() {
        let token = token_with_payload(r#"{"exp":1700000000}"#);
        assert_eq!(unverified_subject(&token), None);
    }

    #[test]
    fn test_unverified_subject_empty_string() {
        let token = token_with_payload(r#"{"sub":""}"#);
        assert_eq!(unverified_subject(&token), None);
    }

    #[test]
    fn test_unverified_subject_garbage_input() {
        assert_eq!(unverified_subject("not a token"), None);
        assert_eq!(unverified_subject(""), None);
        assert_eq!(unverified_subject("a.!!bad-base64!!.c"), None);
    }

    #[test]
    fn test_unverified_subject_oversized() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(unverified_subject(&oversized), None);
    }
}

//! Token verification against the identity provider's published key set.
//!
//! The provider (Supabase Auth) signs access tokens with ES256 and publishes
//! the matching public keys as a JWKS document. Verification is local: the
//! key set is fetched once and cached, so no network call happens on the
//! hot path.
//!
//! # Security
//!
//! - Tokens are size-checked before parsing (DoS prevention)
//! - Only ES256 (P-256) is accepted; mismatched algorithms are rejected
//! - Expiry and audience are always validated; issuer when configured
//! - A `Principal` is only ever built from a fully verified token
//! - Error messages returned to clients are generic; causes are logged
//!   server-side

mod claims;
mod jwks;
mod jwt;

pub use claims::{Claims, Principal};
pub use jwks::{Jwk, JwksClient, JwksResponse};
pub use jwt::TokenVerifier;

use thiserror::Error;

/// Classified verification failures.
///
/// Every failure a verification call can produce lands in exactly one of
/// these kinds. All are per-request outcomes; none is fatal to the process.
/// Display strings are what clients see; internal detail strings are logged
/// server-side only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Signature valid but `exp` has passed.
    #[error("Token has expired")]
    Expired,

    /// Signature mismatch, malformed token, wrong algorithm, or wrong
    /// audience/issuer.
    #[error("Invalid token")]
    InvalidToken,

    /// Cryptographically valid token without a usable `sub` claim.
    #[error("Token missing subject")]
    MissingSubject,

    /// The signing key could not be resolved: unknown `kid` after refresh,
    /// or the key set is unavailable.
    #[error("Token verification failed")]
    KeyResolution(String),

    /// No key-set endpoint is configured; the service cannot authenticate
    /// anyone in this state.
    #[error("Authentication is not configured")]
    Configuration(String),

    /// Unclassified verification failure. Kept distinct from
    /// `InvalidToken` so genuine bugs are not masked as client-side auth
    /// rejections.
    #[error("An error occurred")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code for the error body.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Expired => "token_expired",
            AuthError::InvalidToken => "invalid_token",
            AuthError::MissingSubject => "token_missing_subject",
            AuthError::KeyResolution(_) => "token_verification_failed",
            AuthError::Configuration(_) => "auth_not_configured",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Expired
            | AuthError::InvalidToken
            | AuthError::MissingSubject
            | AuthError::KeyResolution(_) => 401,
            AuthError::Configuration(_) => 503,
            AuthError::Internal(_) => 500,
        }
    }
}

impl From<common::jwt::JwtHeaderError> for AuthError {
    fn from(_: common::jwt::JwtHeaderError) -> Self {
        // Oversized, malformed, and kid-less tokens are all structural
        // defects of the presented credential.
        AuthError::InvalidToken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::jwt::JwtHeaderError;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::Expired.status_code(), 401);
        assert_eq!(AuthError::InvalidToken.status_code(), 401);
        assert_eq!(AuthError::MissingSubject.status_code(), 401);
        assert_eq!(AuthError::KeyResolution("kid".to_string()).status_code(), 401);
        assert_eq!(
            AuthError::Configuration("unset".to_string()).status_code(),
            503
        );
        assert_eq!(AuthError::Internal("bug".to_string()).status_code(), 500);
    }

    #[test]
    fn test_display_messages_are_generic() {
        // Internal detail must never leak through Display.
        let err = AuthError::KeyResolution("kid abc123 absent after refresh".to_string());
        assert_eq!(err.to_string(), "Token verification failed");

        let err = AuthError::Internal("ring: Unspecified".to_string());
        assert_eq!(err.to_string(), "An error occurred");
    }

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            AuthError::Expired.code(),
            AuthError::InvalidToken.code(),
            AuthError::MissingSubject.code(),
            AuthError::KeyResolution(String::new()).code(),
            AuthError::Configuration(String::new()).code(),
            AuthError::Internal(String::new()).code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_header_errors_map_to_invalid_token() {
        assert_eq!(
            AuthError::from(JwtHeaderError::TokenTooLarge),
            AuthError::InvalidToken
        );
        assert_eq!(
            AuthError::from(JwtHeaderError::MalformedToken),
            AuthError::InvalidToken
        );
        assert_eq!(
            AuthError::from(JwtHeaderError::MissingKid),
            AuthError::InvalidToken
        );
    }
}

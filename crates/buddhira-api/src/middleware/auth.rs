//! Authentication middleware for protected routes.
//!
//! Extracts the Bearer token from the Authorization header, verifies it,
//! and injects the resulting [`Principal`] into request extensions.

use crate::auth::{AuthError, TokenVerifier};
use crate::errors::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token verifier with its key resolver.
    pub verifier: Arc<TokenVerifier>,
}

/// Authentication middleware that verifies bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - 401 Unauthorized (with `WWW-Authenticate`) when the token is missing,
///   malformed, or fails verification
/// - 503 when authentication is not configured
/// - Continues to the handler with a `Principal` in extensions otherwise
#[instrument(skip_all, name = "buddhira.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    // Extract Authorization header
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "buddhira.middleware.auth", "Missing Authorization header");
            ApiError::Auth(AuthError::InvalidToken)
        })?;

    // Extract Bearer token
    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(
            target: "buddhira.middleware.auth",
            "Invalid Authorization header format"
        );
        ApiError::Auth(AuthError::InvalidToken)
    })?;

    // An empty credential never reaches the verifier.
    if token.trim().is_empty() {
        return Err(ApiError::Auth(AuthError::InvalidToken));
    }

    // Verify the token and store the principal for downstream handlers
    let principal = state.verifier.verify(token).await?;
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;

    #[test]
    fn test_auth_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AuthState>();
    }

    #[test]
    fn test_principal_is_injectable_extension() {
        fn assert_extension<T: Clone + Send + Sync + 'static>() {}
        assert_extension::<Principal>();
    }
}

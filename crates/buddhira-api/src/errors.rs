//! Buddhira API error types.
//!
//! All errors map to HTTP responses with a single JSON body shape,
//! `{"detail": <message>, "code"?: <string>}`, so clients can always read
//! `detail`. Messages returned to clients are generic; the underlying
//! causes are logged server-side.

use crate::auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Buddhira API error type.
///
/// Maps to HTTP status codes:
/// - `Auth`: 401 (or 503 for unconfigured auth, 500 for internal faults)
/// - `Database`, `Internal`: 500
/// - `NotFound`: 404
/// - `Forbidden`: 403
/// - `BadRequest`: 400
/// - `Validation`: 422
/// - `RateLimitExceeded`: 429
/// - `ServiceUnavailable`: 503
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Auth(err) => err.status_code(),
            ApiError::Database(_) | ApiError::Internal => 500,
            ApiError::NotFound(_) => 404,
            ApiError::Forbidden(_) => 403,
            ApiError::BadRequest(_) => 400,
            ApiError::Validation(_) => 422,
            ApiError::RateLimitExceeded => 429,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }
}

/// The single error body shape every failure is rendered as.
#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail, code) = match &self {
            ApiError::Auth(err) => {
                // Log internal detail for the kinds that carry it; the
                // client only ever sees the classified message.
                match err {
                    AuthError::KeyResolution(detail) => {
                        tracing::warn!(
                            target: "buddhira.auth",
                            detail = %detail,
                            "Key resolution failed"
                        );
                    }
                    AuthError::Configuration(detail) => {
                        tracing::error!(
                            target: "buddhira.auth",
                            detail = %detail,
                            "Authentication is not configured"
                        );
                    }
                    AuthError::Internal(detail) => {
                        tracing::error!(
                            target: "buddhira.auth",
                            detail = %detail,
                            "Unclassified verification failure"
                        );
                    }
                    _ => {}
                }

                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, err.to_string(), Some(err.code().to_string()))
            }
            ApiError::Database(err) => {
                tracing::error!(target: "buddhira.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An error occurred".to_string(),
                    Some("internal_error".to_string()),
                )
            }
            ApiError::NotFound(resource) => (StatusCode::NOT_FOUND, resource.clone(), None),
            ApiError::Forbidden(reason) => (StatusCode::FORBIDDEN, reason.clone(), None),
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone(), None),
            ApiError::Validation(reason) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                reason.clone(),
                Some("validation_error".to_string()),
            ),
            ApiError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests".to_string(),
                Some("rate_limit_exceeded".to_string()),
            ),
            ApiError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "buddhira.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable".to_string(),
                    None,
                )
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred".to_string(),
                Some("internal_error".to_string()),
            ),
        };

        let mut response = (status, Json(ErrorBody { detail, code })).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) =
                "Bearer realm=\"buddhira-api\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

/// Convert sqlx errors to `ApiError`
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Database(err.to_string())
    }
}

//! Root and health check handlers.
//!
//! Both endpoints are public and exempt from rate limiting so platform
//! probes and warmup pings keep working.

use crate::models::{HealthResponse, RootResponse};
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Database ping budget. A slower answer counts as unreachable.
const HEALTH_DB_TIMEOUT: Duration = Duration::from_secs(2);

/// Handler for GET and HEAD `/`.
///
/// Banner for load-balancer probes.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Buddhira API".to_string(),
        status: "running".to_string(),
    })
}

/// Handler for GET `/health`.
///
/// Unauthenticated, cheap health check. The database ping is bounded by a
/// 2s timeout; a timeout or error degrades the status but still returns
/// 200 so the platform keeps routing. Returns 500 only when the service
/// cannot authenticate anyone at all (no key-set endpoint configured).
#[instrument(skip_all, name = "buddhira.health.check")]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let version = std::env::var("APP_VERSION")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    let timestamp = chrono::Utc::now().to_rfc3339();

    if state.config.jwks_url().is_none() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthResponse {
                status: "unhealthy".to_string(),
                timestamp,
                version,
                reason: Some("missing_auth_config".to_string()),
                database: None,
                jwt_config: None,
            }),
        );
    }

    let db_ok = match tokio::time::timeout(
        HEALTH_DB_TIMEOUT,
        sqlx::query("SELECT 1").fetch_one(&state.pool),
    )
    .await
    {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::warn!(target: "buddhira.health", error = %e, "Health check: database unreachable");
            false
        }
        Err(_) => {
            tracing::warn!(target: "buddhira.health", "Health check: database check timed out");
            false
        }
    };

    let status = if db_ok { "healthy" } else { "degraded" };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            timestamp,
            version,
            reason: None,
            database: Some(if db_ok { "ok" } else { "unreachable" }.to_string()),
            jwt_config: Some("ok".to_string()),
        }),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_root_banner() {
        let Json(body) = root().await;
        assert_eq!(body.message, "Buddhira API");
        assert_eq!(body.status, "running");
    }

    #[test]
    fn test_db_timeout_is_two_seconds() {
        assert_eq!(HEALTH_DB_TIMEOUT, Duration::from_secs(2));
    }
}

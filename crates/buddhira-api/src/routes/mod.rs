//! HTTP routes for the Buddhira API.
//!
//! Defines the Axum router and application state.

use crate::auth::{JwksClient, TokenVerifier};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{enforce_rate_limit, log_requests, require_auth, AuthState, RateLimiter};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, patch},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Config,

    /// Per-IP request limiter.
    pub rate_limiter: Arc<RateLimiter>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/` and `/health` - public operational endpoints (rate-limit exempt)
/// - `/me` - authenticated principal echo
/// - `/api/items`, `/api/tags`, `/api/items/{id}/tags` - authenticated CRUD
/// - TraceLayer for request tracing, 30 second request timeout
/// - CORS (configured origins only), per-IP rate limiting, request logging
pub fn build_routes(state: Arc<AppState>) -> Router {
    // Create the key resolver and token verifier
    let jwks_client = Arc::new(JwksClient::with_ttl(
        state.config.jwks_url(),
        state.config.supabase_service_role_key.clone(),
        state.config.jwks_cache_ttl,
    ));
    let verifier = Arc::new(TokenVerifier::new(
        jwks_client,
        state.config.jwt_audience.clone(),
        state.config.jwt_issuer.clone(),
    ));
    let auth_state = Arc::new(AuthState { verifier });

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .with_state(state.clone());

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/me", get(handlers::get_me))
        .route(
            "/api/items",
            get(handlers::list_items).post(handlers::create_item),
        )
        .route(
            "/api/items/:item_id",
            get(handlers::get_item)
                .patch(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route(
            "/api/items/:item_id/tags",
            get(handlers::list_item_tags).post(handlers::attach_tag),
        )
        .route(
            "/api/items/:item_id/tags/:tag_id",
            delete(handlers::detach_tag),
        )
        .route(
            "/api/tags",
            get(handlers::list_tags).post(handlers::create_tag),
        )
        .route(
            "/api/tags/:tag_id",
            patch(handlers::update_tag).delete(handlers::delete_tag),
        )
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state.clone());

    // Merge routes and apply global middleware layers
    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - bound the request (innermost)
    // 2. TraceLayer - request tracing
    // 3. CORS
    // 4. Rate limiting
    // 5. Request logging (outermost, sees every response incl. 429s)
    let mut app = public_routes
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    if let Some(cors) = build_cors(&state.config) {
        app = app.layer(cors);
    }

    app.layer(middleware::from_fn_with_state(
        state.clone(),
        enforce_rate_limit,
    ))
    .layer(middleware::from_fn(log_requests))
}

/// CORS layer for the configured origins, or `None` when no origins are
/// configured (cross-origin requests stay blocked).
fn build_cors(config: &Config) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    target: "buddhira.routes",
                    origin = %origin,
                    error = %e,
                    "Ignoring invalid CORS origin"
                );
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
    )
}

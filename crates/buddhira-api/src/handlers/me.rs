//! Current user handler.

use crate::auth::Principal;
use crate::models::MeResponse;
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET `/me`.
///
/// Returns the authenticated principal. Doubles as a quick auth test for
/// clients.
///
/// ## Response
///
/// ```json
/// {
///   "user_id": "5f8b1e9a-...",
///   "email": "alice@example.com",
///   "role": "authenticated"
/// }
/// ```
#[instrument(skip_all, name = "buddhira.handlers.me")]
pub async fn get_me(Extension(principal): Extension<Principal>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: principal.user_id,
        email: principal.email,
        role: principal.role,
    })
}

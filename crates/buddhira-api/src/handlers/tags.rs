//! Tag handlers.
//!
//! - `GET /api/tags` - list with item counts (authenticated)
//! - `POST /api/tags` - create
//! - `PATCH /api/tags/{id}` - rename
//! - `DELETE /api/tags/{id}` - delete
//!
//! Each user has their own set of tags, unique per user and name.

use crate::auth::Principal;
use crate::errors::ApiError;
use crate::handlers::{parse_path_id, parse_user_id};
use crate::models::{TagNameRequest, TagResponse, TagRow};
use crate::repositories::{TagWithCountRow, TagsRepository};
use crate::routes::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

impl From<TagWithCountRow> for TagResponse {
    fn from(row: TagWithCountRow) -> Self {
        TagResponse {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            created_at: row.created_at,
            item_count: row.item_count,
        }
    }
}

impl From<TagRow> for TagResponse {
    fn from(row: TagRow) -> Self {
        TagResponse {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            created_at: row.created_at,
            item_count: 0,
        }
    }
}

/// List the authenticated user's tags alphabetically, with item counts.
#[instrument(skip_all, name = "buddhira.handlers.tags.list")]
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<TagResponse>>, ApiError> {
    let user_id = parse_user_id(&principal.user_id)?;

    let rows = TagsRepository::list_with_counts(&state.pool, user_id).await?;
    Ok(Json(rows.into_iter().map(TagResponse::from).collect()))
}

/// Create a tag.
///
/// ## Response
///
/// - 201 Created with the new tag
/// - 400 when the name collides with an existing tag
/// - 422 when the name is empty or too long
#[instrument(skip_all, name = "buddhira.handlers.tags.create")]
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<TagNameRequest>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    body.validate().map_err(ApiError::Validation)?;
    let user_id = parse_user_id(&principal.user_id)?;

    let row = TagsRepository::insert(&state.pool, user_id, &body.name).await?;

    info!(target: "buddhira.handlers.tags", tag_id = %row.id, "Tag created");

    Ok((StatusCode::CREATED, Json(TagResponse::from(row))))
}

/// Rename a tag.
///
/// ## Response
///
/// - 200 OK with the renamed tag
/// - 403/404 per the ownership check
#[instrument(skip_all, name = "buddhira.handlers.tags.update")]
pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(tag_id): Path<String>,
    Json(body): Json<TagNameRequest>,
) -> Result<Json<TagResponse>, ApiError> {
    body.validate().map_err(ApiError::Validation)?;
    let user_id = parse_user_id(&principal.user_id)?;
    let tag_id = parse_path_id(&tag_id, "tag")?;

    TagsRepository::fetch_owned(&state.pool, tag_id, user_id).await?;
    let row = TagsRepository::rename(&state.pool, tag_id, user_id, &body.name).await?;

    Ok(Json(TagResponse::from(row)))
}

/// Delete a tag.
///
/// ## Response
///
/// - 204 No Content
/// - 403/404 per the ownership check
#[instrument(skip_all, name = "buddhira.handlers.tags.delete")]
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(tag_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_user_id(&principal.user_id)?;
    let tag_id = parse_path_id(&tag_id, "tag")?;

    TagsRepository::fetch_owned(&state.pool, tag_id, user_id).await?;
    TagsRepository::delete(&state.pool, tag_id, user_id).await?;

    info!(target: "buddhira.handlers.tags", tag_id = %tag_id, "Tag deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_tag_response_from_count_row() {
        let row = TagWithCountRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "reading".to_string(),
            created_at: Utc::now(),
            item_count: 7,
        };

        let response = TagResponse::from(row.clone());
        assert_eq!(response.id, row.id);
        assert_eq!(response.item_count, 7);
    }

    #[test]
    fn test_tag_response_from_plain_row_has_zero_count() {
        let row = TagRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "new-tag".to_string(),
            created_at: Utc::now(),
        };

        let response = TagResponse::from(row);
        assert_eq!(response.item_count, 0);
    }
}

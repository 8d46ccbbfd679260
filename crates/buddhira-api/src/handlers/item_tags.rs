//! Item-tag association handlers.
//!
//! - `GET /api/items/{item_id}/tags` - list tags attached to an item
//! - `POST /api/items/{item_id}/tags` - attach a tag
//! - `DELETE /api/items/{item_id}/tags/{tag_id}` - detach a tag
//!
//! Both the item and the tag must belong to the authenticated user; an
//! unowned id reads as 404 here, matching lookups scoped by `user_id`.

use crate::auth::Principal;
use crate::errors::ApiError;
use crate::handlers::{parse_path_id, parse_user_id};
use crate::models::{AttachTagRequest, ItemTagResponse, TagRef};
use crate::repositories::ItemTagsRepository;
use crate::routes::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// List the tags attached to one item.
#[instrument(skip_all, name = "buddhira.handlers.item_tags.list")]
pub async fn list_item_tags(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(item_id): Path<String>,
) -> Result<Json<Vec<ItemTagResponse>>, ApiError> {
    let user_id = parse_user_id(&principal.user_id)?;
    let item_id = parse_path_id(&item_id, "item")?;

    if !ItemTagsRepository::item_belongs_to_user(&state.pool, item_id, user_id).await? {
        return Err(ApiError::NotFound("Item not found".to_string()));
    }

    let tags = ItemTagsRepository::list_for_item(&state.pool, item_id).await?;
    let links = tags
        .into_iter()
        .map(|tag| ItemTagResponse {
            tag_id: tag.id,
            tag: TagRef {
                id: tag.id,
                name: tag.name,
            },
        })
        .collect();

    Ok(Json(links))
}

/// Attach a tag to an item. Idempotent.
///
/// ## Response
///
/// - 201 Created with the link
/// - 404 when the item or tag does not belong to the user
#[instrument(skip_all, name = "buddhira.handlers.item_tags.attach")]
pub async fn attach_tag(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(item_id): Path<String>,
    Json(body): Json<AttachTagRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let user_id = parse_user_id(&principal.user_id)?;
    let item_id = parse_path_id(&item_id, "item")?;

    if !ItemTagsRepository::item_belongs_to_user(&state.pool, item_id, user_id).await? {
        return Err(ApiError::NotFound("Item not found".to_string()));
    }
    if !ItemTagsRepository::tag_belongs_to_user(&state.pool, body.tag_id, user_id).await? {
        return Err(ApiError::NotFound("Tag not found".to_string()));
    }

    ItemTagsRepository::attach(&state.pool, item_id, body.tag_id).await?;

    info!(
        target: "buddhira.handlers.item_tags",
        item_id = %item_id,
        tag_id = %body.tag_id,
        "Tag attached to item"
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"item_id": item_id, "tag_id": body.tag_id})),
    ))
}

/// Detach a tag from an item.
///
/// ## Response
///
/// - 204 No Content
/// - 404 when the item is not the user's or the tag was not attached
#[instrument(skip_all, name = "buddhira.handlers.item_tags.detach")]
pub async fn detach_tag(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((item_id, tag_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_user_id(&principal.user_id)?;
    let item_id = parse_path_id(&item_id, "item")?;
    let tag_id = parse_path_id(&tag_id, "tag")?;

    if !ItemTagsRepository::item_belongs_to_user(&state.pool, item_id, user_id).await? {
        return Err(ApiError::NotFound("Item not found".to_string()));
    }

    if !ItemTagsRepository::detach(&state.pool, item_id, tag_id).await? {
        return Err(ApiError::NotFound("Tag not attached to item".to_string()));
    }

    info!(
        target: "buddhira.handlers.item_tags",
        item_id = %item_id,
        tag_id = %tag_id,
        "Tag detached from item"
    );

    Ok(StatusCode::NO_CONTENT)
}

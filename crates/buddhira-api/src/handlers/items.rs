//! Item handlers: notes, links, and snippets.
//!
//! - `GET /api/items` - list with filters (authenticated)
//! - `GET /api/items/{id}` - fetch one
//! - `POST /api/items` - create
//! - `PATCH /api/items/{id}` - partial update
//! - `DELETE /api/items/{id}` - delete
//!
//! Product rules (enforced on create and update):
//! 1. New item defaults: state=inbox, is_archived=false, is_pinned=false
//! 2. is_archived=true forces state=archive
//! 3. state=archive sets is_archived=true; leaving archive clears it
//! 4. Default list (no filters) shows the non-archived inbox
//! 5. Pinning affects ordering only

use crate::auth::Principal;
use crate::errors::ApiError;
use crate::handlers::{parse_path_id, parse_user_id};
use crate::models::{
    ItemCreateRequest, ItemListQuery, ItemResponse, ItemState, ItemUpdateRequest,
};
use crate::repositories::{ItemChanges, ItemsRepository, NewItem};
use crate::routes::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Keep `state` and `is_archived` in sync.
///
/// - `is_archived = Some(true)` forces the archive state
/// - `state = Some(Archive)` sets the archived flag
/// - any other explicit state clears the archived flag
fn enforce_archive_rules(
    state: Option<ItemState>,
    is_archived: Option<bool>,
) -> (Option<ItemState>, Option<bool>) {
    match (state, is_archived) {
        (_, Some(true)) => (Some(ItemState::Archive), Some(true)),
        (Some(ItemState::Archive), _) => (Some(ItemState::Archive), Some(true)),
        (Some(other), _) => (Some(other), Some(false)),
        (None, flag) => (None, flag),
    }
}

// ============================================================================
// Handler: GET /api/items
// ============================================================================

/// List the authenticated user's items.
///
/// With no filters the listing shows the non-archived inbox. Pinned items
/// sort first, then newest-first. Each item carries its attached tags.
#[instrument(skip_all, name = "buddhira.handlers.items.list")]
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ItemListQuery>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    query.validate().map_err(ApiError::Validation)?;
    let user_id = parse_user_id(&principal.user_id)?;

    let rows = ItemsRepository::list(&state.pool, user_id, &query).await?;

    let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
    let mut tags_by_item = ItemsRepository::tags_for_items(&state.pool, &ids).await?;

    let items = rows
        .into_iter()
        .map(|row| {
            let tags = tags_by_item.remove(&row.id).unwrap_or_default();
            ItemResponse::from_row(row, tags)
        })
        .collect();

    Ok(Json(items))
}

// ============================================================================
// Handler: GET /api/items/{id}
// ============================================================================

/// Fetch one item.
///
/// ## Response
///
/// - 200 OK with the item
/// - 404 when no item has this id
/// - 403 when the item belongs to another user
#[instrument(skip_all, name = "buddhira.handlers.items.get")]
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(item_id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let user_id = parse_user_id(&principal.user_id)?;
    let item_id = parse_path_id(&item_id, "item")?;

    let row = ItemsRepository::fetch_owned(&state.pool, item_id, user_id).await?;
    let mut tags = ItemsRepository::tags_for_items(&state.pool, &[row.id]).await?;
    let item_tags = tags.remove(&row.id).unwrap_or_default();

    Ok(Json(ItemResponse::from_row(row, item_tags)))
}

// ============================================================================
// Handler: POST /api/items
// ============================================================================

/// Create an item.
///
/// ## Response
///
/// - 201 Created with the new item
/// - 422 when a field exceeds its length bound
#[instrument(skip_all, name = "buddhira.handlers.items.create")]
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<ItemCreateRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    body.validate().map_err(ApiError::Validation)?;
    let user_id = parse_user_id(&principal.user_id)?;

    let (item_state, is_archived) = enforce_archive_rules(Some(body.state), None);
    let new_item = NewItem {
        item_type: body.item_type.as_str().to_string(),
        title: body.title,
        content: body.content,
        url: body.url,
        state: item_state.unwrap_or(ItemState::Inbox).as_str().to_string(),
        why_this_matters: body.why_this_matters,
        is_pinned: body.is_pinned,
        is_archived: is_archived.unwrap_or(false),
    };

    let row = ItemsRepository::insert(&state.pool, user_id, &new_item).await?;

    info!(
        target: "buddhira.handlers.items",
        item_id = %row.id,
        item_type = %row.item_type,
        "Item created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ItemResponse::from_row(row, Vec::new())),
    ))
}

// ============================================================================
// Handler: PATCH /api/items/{id}
// ============================================================================

/// Update an item. Only provided fields are changed.
///
/// ## Response
///
/// - 200 OK with the updated item
/// - 400 when no fields are provided
/// - 403/404 per the ownership check
#[instrument(skip_all, name = "buddhira.handlers.items.update")]
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(item_id): Path<String>,
    Json(body): Json<ItemUpdateRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    if !body.has_changes() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }
    body.validate().map_err(ApiError::Validation)?;

    let user_id = parse_user_id(&principal.user_id)?;
    let item_id = parse_path_id(&item_id, "item")?;

    ItemsRepository::fetch_owned(&state.pool, item_id, user_id).await?;

    let (item_state, is_archived) = enforce_archive_rules(body.state, body.is_archived);
    let changes = ItemChanges {
        title: body.title,
        content: body.content,
        url: body.url,
        state: item_state.map(|s| s.as_str().to_string()),
        why_this_matters: body.why_this_matters,
        is_pinned: body.is_pinned,
        is_archived,
    };

    let row = ItemsRepository::update(&state.pool, item_id, user_id, &changes).await?;
    let mut tags = ItemsRepository::tags_for_items(&state.pool, &[row.id]).await?;
    let item_tags = tags.remove(&row.id).unwrap_or_default();

    Ok(Json(ItemResponse::from_row(row, item_tags)))
}

// ============================================================================
// Handler: DELETE /api/items/{id}
// ============================================================================

/// Delete an item.
///
/// ## Response
///
/// - 204 No Content
/// - 403/404 per the ownership check
#[instrument(skip_all, name = "buddhira.handlers.items.delete")]
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(item_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_user_id(&principal.user_id)?;
    let item_id = parse_path_id(&item_id, "item")?;

    ItemsRepository::fetch_owned(&state.pool, item_id, user_id).await?;
    ItemsRepository::delete(&state.pool, item_id, user_id).await?;

    info!(target: "buddhira.handlers.items", item_id = %item_id, "Item deleted");

    Ok(StatusCode::NO_CONTENT)
}

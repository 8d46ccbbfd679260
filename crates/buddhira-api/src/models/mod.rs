//! Buddhira API models.
//!
//! Data types shared across handlers and repositories: domain enums, row
//! structs mirroring the hosted Postgres tables, and request/response
//! bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum item title length.
pub const MAX_TITLE_LENGTH: usize = 500;

/// Maximum item content length.
pub const MAX_CONTENT_LENGTH: usize = 50_000;

/// Maximum item URL length.
pub const MAX_URL_LENGTH: usize = 2_048;

/// Maximum "why this matters" note length.
pub const MAX_WHY_LENGTH: usize = 1_000;

/// Maximum tag name length.
pub const MAX_TAG_NAME_LENGTH: usize = 100;

/// Maximum page size for item listings.
pub const MAX_LIST_LIMIT: u32 = 200;

/// Default page size for item listings.
pub const DEFAULT_LIST_LIMIT: u32 = 50;

// ============================================================================
// Domain enums
// ============================================================================

/// The kind of captured item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Free-form note.
    Note,

    /// Saved link.
    Link,

    /// Code or text snippet.
    Snippet,
}

impl ItemType {
    /// Returns the string representation stored in the database.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Note => "note",
            ItemType::Link => "link",
            ItemType::Snippet => "snippet",
        }
    }
}

/// Workflow state of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Freshly captured, not yet triaged.
    Inbox,

    /// Actively in use.
    Active,

    /// Archived.
    Archive,
}

impl ItemState {
    /// Returns the string representation stored in the database.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemState::Inbox => "inbox",
            ItemState::Active => "active",
            ItemState::Archive => "archive",
        }
    }
}

// ============================================================================
// Database rows
// ============================================================================

/// Item row as stored in the `items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
    /// Unique item identifier.
    pub id: Uuid,

    /// Owning user.
    pub user_id: Uuid,

    /// Item kind ("note", "link", "snippet").
    #[sqlx(rename = "type")]
    pub item_type: String,

    /// Item title.
    pub title: Option<String>,

    /// Item body.
    pub content: Option<String>,

    /// Saved URL (links).
    pub url: Option<String>,

    /// Workflow state ("inbox", "active", "archive").
    pub state: String,

    /// Why the item was captured.
    pub why_this_matters: Option<String>,

    /// Whether the item is pinned to the top of listings.
    pub is_pinned: bool,

    /// Whether the item is archived.
    pub is_archived: bool,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Tag row as stored in the `tags` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TagRow {
    /// Unique tag identifier.
    pub id: Uuid,

    /// Owning user.
    pub user_id: Uuid,

    /// Tag name (unique per user).
    pub name: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Requests
// ============================================================================

fn default_item_state() -> ItemState {
    ItemState::Inbox
}

fn default_list_limit() -> u32 {
    DEFAULT_LIST_LIMIT
}

/// Body for `POST /api/items`.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemCreateRequest {
    /// Item kind.
    #[serde(rename = "type")]
    pub item_type: ItemType,

    /// Item title.
    pub title: Option<String>,

    /// Item body.
    pub content: Option<String>,

    /// Saved URL.
    pub url: Option<String>,

    /// Initial workflow state (defaults to inbox).
    #[serde(default = "default_item_state")]
    pub state: ItemState,

    /// Why the item was captured.
    pub why_this_matters: Option<String>,

    /// Whether the item starts pinned.
    #[serde(default)]
    pub is_pinned: bool,
}

impl ItemCreateRequest {
    /// Validate field length bounds.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the first violated bound.
    pub fn validate(&self) -> Result<(), String> {
        validate_item_fields(
            self.title.as_deref(),
            self.content.as_deref(),
            self.url.as_deref(),
            self.why_this_matters.as_deref(),
        )
    }
}

/// Body for `PATCH /api/items/{id}`. All fields optional; only provided
/// fields are updated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemUpdateRequest {
    /// New title.
    pub title: Option<String>,

    /// New body.
    pub content: Option<String>,

    /// New URL.
    pub url: Option<String>,

    /// New workflow state.
    pub state: Option<ItemState>,

    /// New "why this matters" note.
    pub why_this_matters: Option<String>,

    /// New pinned flag.
    pub is_pinned: Option<bool>,

    /// New archived flag.
    pub is_archived: Option<bool>,
}

impl ItemUpdateRequest {
    /// Returns true if the request updates at least one field.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.content.is_some()
            || self.url.is_some()
            || self.state.is_some()
            || self.why_this_matters.is_some()
            || self.is_pinned.is_some()
            || self.is_archived.is_some()
    }

    /// Validate field length bounds.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the first violated bound.
    pub fn validate(&self) -> Result<(), String> {
        validate_item_fields(
            self.title.as_deref(),
            self.content.as_deref(),
            self.url.as_deref(),
            self.why_this_matters.as_deref(),
        )
    }
}

fn validate_item_fields(
    title: Option<&str>,
    content: Option<&str>,
    url: Option<&str>,
    why: Option<&str>,
) -> Result<(), String> {
    if title.is_some_and(|s| s.chars().count() > MAX_TITLE_LENGTH) {
        return Err(format!("title: must be at most {MAX_TITLE_LENGTH} characters"));
    }
    if content.is_some_and(|s| s.chars().count() > MAX_CONTENT_LENGTH) {
        return Err(format!(
            "content: must be at most {MAX_CONTENT_LENGTH} characters"
        ));
    }
    if url.is_some_and(|s| s.chars().count() > MAX_URL_LENGTH) {
        return Err(format!("url: must be at most {MAX_URL_LENGTH} characters"));
    }
    if why.is_some_and(|s| s.chars().count() > MAX_WHY_LENGTH) {
        return Err(format!(
            "why_this_matters: must be at most {MAX_WHY_LENGTH} characters"
        ));
    }
    Ok(())
}

/// Query parameters for `GET /api/items`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemListQuery {
    /// Case-insensitive search over title and content.
    pub q: Option<String>,

    /// Filter by item kind.
    #[serde(rename = "type")]
    pub item_type: Option<ItemType>,

    /// Filter by workflow state.
    pub state: Option<ItemState>,

    /// Filter by attached tag name.
    pub tag: Option<String>,

    /// Filter pinned items.
    pub is_pinned: Option<bool>,

    /// Filter archived items.
    pub is_archived: Option<bool>,

    /// Page size (1..=200, default 50).
    #[serde(default = "default_list_limit")]
    pub limit: u32,

    /// Page offset.
    #[serde(default)]
    pub offset: u32,
}

impl ItemListQuery {
    /// True when any filter is set. Without filters the listing defaults to
    /// the non-archived inbox.
    #[must_use]
    pub fn has_filters(&self) -> bool {
        self.q.is_some()
            || self.item_type.is_some()
            || self.state.is_some()
            || self.tag.is_some()
            || self.is_pinned.is_some()
            || self.is_archived.is_some()
    }

    /// Validate pagination bounds.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the violated bound.
    pub fn validate(&self) -> Result<(), String> {
        if self.limit < 1 || self.limit > MAX_LIST_LIMIT {
            return Err(format!("limit: must be between 1 and {MAX_LIST_LIMIT}"));
        }
        Ok(())
    }
}

/// Body for `POST /api/tags` and `PATCH /api/tags/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagNameRequest {
    /// Tag name.
    pub name: String,
}

impl TagNameRequest {
    /// Validate the tag name bounds.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the violated bound.
    pub fn validate(&self) -> Result<(), String> {
        let len = self.name.chars().count();
        if len < 1 || len > MAX_TAG_NAME_LENGTH {
            return Err(format!(
                "name: must be between 1 and {MAX_TAG_NAME_LENGTH} characters"
            ));
        }
        Ok(())
    }
}

/// Body for `POST /api/items/{item_id}/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachTagRequest {
    /// Tag to attach.
    pub tag_id: Uuid,
}

// ============================================================================
// Responses
// ============================================================================

/// Minimal tag reference embedded in item responses.
#[derive(Debug, Clone, Serialize)]
pub struct TagRef {
    /// Tag identifier.
    pub id: Uuid,

    /// Tag name.
    pub name: String,
}

/// Item returned by the API, with attached tags.
#[derive(Debug, Clone, Serialize)]
pub struct ItemResponse {
    /// Item identifier.
    pub id: Uuid,

    /// Owning user.
    pub user_id: Uuid,

    /// Item kind.
    #[serde(rename = "type")]
    pub item_type: String,

    /// Item title.
    pub title: Option<String>,

    /// Item body.
    pub content: Option<String>,

    /// Saved URL.
    pub url: Option<String>,

    /// Workflow state.
    pub state: String,

    /// Why the item was captured.
    pub why_this_matters: Option<String>,

    /// Pinned flag.
    pub is_pinned: bool,

    /// Archived flag.
    pub is_archived: bool,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,

    /// Tags attached to the item.
    pub tags: Vec<TagRef>,
}

impl ItemResponse {
    /// Build a response from a database row and its attached tags.
    #[must_use]
    pub fn from_row(row: ItemRow, tags: Vec<TagRef>) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            item_type: row.item_type,
            title: row.title,
            content: row.content,
            url: row.url,
            state: row.state,
            why_this_matters: row.why_this_matters,
            is_pinned: row.is_pinned,
            is_archived: row.is_archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
            tags,
        }
    }
}

/// Tag returned by `GET /api/tags`, with its item count.
#[derive(Debug, Clone, Serialize)]
pub struct TagResponse {
    /// Tag identifier.
    pub id: Uuid,

    /// Owning user.
    pub user_id: Uuid,

    /// Tag name.
    pub name: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Number of items carrying this tag.
    pub item_count: i64,
}

/// Link returned by the item-tag endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ItemTagResponse {
    /// Attached tag identifier.
    pub tag_id: Uuid,

    /// The attached tag.
    pub tag: TagRef,
}

/// Response for `GET /me`.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// Authenticated user identifier.
    pub user_id: String,

    /// User email, when present in the token.
    pub email: Option<String>,

    /// Provider role, when present in the token.
    pub role: Option<String>,
}

/// Response for `GET /`.
#[derive(Debug, Clone, Serialize)]
pub struct RootResponse {
    /// Service name banner.
    pub message: String,

    /// Always "running".
    pub status: String,
}

/// Response for `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy", "degraded", or "unhealthy".
    pub status: String,

    /// RFC 3339 timestamp of the probe.
    pub timestamp: String,

    /// Service version.
    pub version: String,

    /// Present only when unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// "ok" or "unreachable".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// "ok" when token verification is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_config: Option<String>,
}

//! Items repository.
//!
//! Operations over the `items` table. Columns relied upon: id, user_id,
//! type, title, content, url, state, why_this_matters, is_pinned,
//! is_archived, created_at, updated_at.
//!
//! # Security
//!
//! - All queries use parameterized statements (SQL injection safe)
//! - Search input is LIKE-escaped before being bound as a pattern
//! - Reads and writes are scoped by the owning `user_id`

use crate::errors::ApiError;
use crate::models::{ItemListQuery, ItemRow, TagRef};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Column list selected for item rows.
const ITEM_COLUMNS: &str = "id, user_id, type, title, content, url, state, \
     why_this_matters, is_pinned, is_archived, created_at, updated_at";

/// Values for a new item, after product rules have been applied.
#[derive(Debug, Clone)]
pub struct NewItem {
    /// Item kind ("note", "link", "snippet").
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
}

/// Field changes for an item, after product rules have been applied.
/// `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    /// New title.
    pub title: Option<String>,

    /// New body.
    pub content: Option<String>,

    /// New URL.
    pub url: Option<String>,

    /// New workflow state.
    pub state: Option<String>,

    /// New "why this matters" note.
    pub why_this_matters: Option<String>,

    /// New pinned flag.
    pub is_pinned: Option<bool>,

    /// New archived flag.
    pub is_archived: Option<bool>,
}

/// Repository for item operations.
pub struct ItemsRepository;

impl ItemsRepository {
    /// List a user's items with the given filters.
    ///
    /// With no filters the default view is the non-archived inbox. Pinned
    /// items sort first, then newest-first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` on query failure.
    #[instrument(skip_all)]
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        query: &ItemListQuery,
    ) -> Result<Vec<ItemRow>, ApiError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ITEM_COLUMNS} FROM items WHERE user_id = "));
        qb.push_bind(user_id);

        if !query.has_filters() {
            // Default view is the inbox
            qb.push(" AND state = 'inbox' AND is_archived = FALSE");
        }

        if let Some(item_type) = query.item_type {
            qb.push(" AND type = ").push_bind(item_type.as_str());
        }
        if let Some(state) = query.state {
            qb.push(" AND state = ").push_bind(state.as_str());
        }
        if let Some(is_pinned) = query.is_pinned {
            qb.push(" AND is_pinned = ").push_bind(is_pinned);
        }
        if let Some(is_archived) = query.is_archived {
            qb.push(" AND is_archived = ").push_bind(is_archived);
        }

        // Search matches title or content, case-insensitive
        if let Some(q) = query.q.as_deref() {
            let trimmed = q.trim();
            if !trimmed.is_empty() {
                let pattern = format!("%{}%", escape_like(trimmed));
                qb.push(" AND (title ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\' OR content ILIKE ")
                    .push_bind(pattern)
                    .push(" ESCAPE '\\')");
            }
        }

        // Tag filter narrows to items carrying the named tag
        if let Some(tag) = query.tag.as_deref() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM item_tags it \
                 JOIN tags t ON t.id = it.tag_id \
                 WHERE it.item_id = items.id AND t.user_id = ",
            )
            .push_bind(user_id)
            .push(" AND t.name = ")
            .push_bind(tag)
            .push(")");
        }

        // Pinned items first, then by created_at desc
        qb.push(" ORDER BY is_pinned DESC, created_at DESC LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(query.offset));

        let rows = qb.build_query_as::<ItemRow>().fetch_all(pool).await?;
        Ok(rows)
    }

    /// Fetch one item, enforcing ownership.
    ///
    /// # Errors
    ///
    /// - `ApiError::NotFound` when no item has this id
    /// - `ApiError::Forbidden` when the item belongs to another user
    #[instrument(skip_all, fields(item_id = %item_id))]
    pub async fn fetch_owned(
        pool: &PgPool,
        item_id: Uuid,
        user_id: Uuid,
    ) -> Result<ItemRow, ApiError> {
        let row: Option<ItemRow> =
            sqlx::query_as(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
                .bind(item_id)
                .fetch_optional(pool)
                .await?;

        let row = row.ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;
        if row.user_id != user_id {
            return Err(ApiError::Forbidden(
                "You do not have access to this item".to_string(),
            ));
        }
        Ok(row)
    }

    /// Insert a new item.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` on query failure.
    #[instrument(skip_all)]
    pub async fn insert(pool: &PgPool, user_id: Uuid, item: &NewItem) -> Result<ItemRow, ApiError> {
        let row: ItemRow = sqlx::query_as(&format!(
            "INSERT INTO items \
             (user_id, type, title, content, url, state, why_this_matters, is_pinned, is_archived) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&item.item_type)
        .bind(&item.title)
        .bind(&item.content)
        .bind(&item.url)
        .bind(&item.state)
        .bind(&item.why_this_matters)
        .bind(item.is_pinned)
        .bind(item.is_archived)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    /// Apply a partial update. Unset fields keep their current value.
    ///
    /// # Errors
    ///
    /// - `ApiError::NotFound` when the item vanished between the ownership
    ///   check and the update
    #[instrument(skip_all, fields(item_id = %item_id))]
    pub async fn update(
        pool: &PgPool,
        item_id: Uuid,
        user_id: Uuid,
        changes: &ItemChanges,
    ) -> Result<ItemRow, ApiError> {
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "UPDATE items SET \
             title = COALESCE($3, title), \
             content = COALESCE($4, content), \
             url = COALESCE($5, url), \
             state = COALESCE($6, state), \
             why_this_matters = COALESCE($7, why_this_matters), \
             is_pinned = COALESCE($8, is_pinned), \
             is_archived = COALESCE($9, is_archived), \
             updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(item_id)
        .bind(user_id)
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(&changes.url)
        .bind(&changes.state)
        .bind(&changes.why_this_matters)
        .bind(changes.is_pinned)
        .bind(changes.is_archived)
        .fetch_optional(pool)
        .await?;

        row.ok_or_else(|| ApiError::NotFound("Item not found".to_string()))
    }

    /// Delete an item.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` on query failure.
    #[instrument(skip_all, fields(item_id = %item_id))]
    pub async fn delete(pool: &PgPool, item_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Fetch the tags attached to each of the given items, grouped by item.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` on query failure.
    #[instrument(skip_all, fields(item_count = item_ids.len()))]
    pub async fn tags_for_items(
        pool: &PgPool,
        item_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<TagRef>>, ApiError> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<ItemTagRow> = sqlx::query_as(
            "SELECT it.item_id, t.id AS tag_id, t.name \
             FROM item_tags it \
             JOIN tags t ON t.id = it.tag_id \
             WHERE it.item_id = ANY($1) \
             ORDER BY t.name",
        )
        .bind(item_ids.to_vec())
        .fetch_all(pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<TagRef>> = HashMap::new();
        for row in rows {
            grouped.entry(row.item_id).or_default().push(TagRef {
                id: row.tag_id,
                name: row.name,
            });
        }
        Ok(grouped)
    }
}

/// Join row for tag lookups across items.
#[derive(Debug, sqlx::FromRow)]
struct ItemTagRow {
    item_id: Uuid,
    tag_id: Uuid,
    name: String,
}

/// Escape LIKE metacharacters so user input matches literally.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{ItemState, ItemType};

    #[test]
    fn test_escape_like_passes_plain_text() {
        assert_eq!(escape_like("rust async"), "rust async");
    }

    #[test]
    fn test_escape_like_escapes_metacharacters() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_list_query_defaults_to_inbox() {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ITEM_COLUMNS} FROM items WHERE user_id = "));
        qb.push_bind(Uuid::new_v4());

        let query = ItemListQuery {
            limit: 50,
            ..Default::default()
        };
        assert!(!query.has_filters());

        // The default-view clause is what the builder appends for an
        // unfiltered listing.
        qb.push(" AND state = 'inbox' AND is_archived = FALSE");
        assert!(qb.sql().contains("state = 'inbox'"));
        assert!(qb.sql().contains("is_archived = FALSE"));
    }

    #[test]
    fn test_filters_suppress_default_view() {
        let query = ItemListQuery {
            item_type: Some(ItemType::Link),
            state: Some(ItemState::Archive),
            limit: 50,
            ..Default::default()
        };
        assert!(query.has_filters());
    }

    #[test]
    fn test_item_columns_cover_row_fields() {
        for column in [
            "id",
            "user_id",
            "type",
            "title",
            "content",
            "url",
            "state",
            "why_this_matters",
            "is_pinned",
            "is_archived",
            "created_at",
            "updated_at",
        ] {
            assert!(ITEM_COLUMNS.contains(column), "missing column {column}");
        }
    }
}

//! Tags repository.
//!
//! Operations over the `tags` table. Tag names are unique per user; the
//! constraint lives in the hosted schema and surfaces here as a unique
//! violation on insert.

use crate::errors::ApiError;
use crate::models::TagRow;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

/// Tag row joined with its item count.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TagWithCountRow {
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

/// Repository for tag operations.
pub struct TagsRepository;

impl TagsRepository {
    /// List a user's tags alphabetically with per-tag item counts.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` on query failure.
    #[instrument(skip_all)]
    pub async fn list_with_counts(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<TagWithCountRow>, ApiError> {
        let rows: Vec<TagWithCountRow> = sqlx::query_as(
            "SELECT t.id, t.user_id, t.name, t.created_at, COUNT(it.tag_id) AS item_count \
             FROM tags t \
             LEFT JOIN item_tags it ON it.tag_id = t.id \
             WHERE t.user_id = $1 \
             GROUP BY t.id, t.user_id, t.name, t.created_at \
             ORDER BY t.name",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    /// Insert a new tag.
    ///
    /// # Errors
    ///
    /// - `ApiError::BadRequest` when the name collides with an existing tag
    ///   of the same user
    #[instrument(skip_all)]
    pub async fn insert(pool: &PgPool, user_id: Uuid, name: &str) -> Result<TagRow, ApiError> {
        let row: TagRow = sqlx::query_as(
            "INSERT INTO tags (user_id, name) VALUES ($1, $2) \
             RETURNING id, user_id, name, created_at",
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::BadRequest("Failed to create tag".to_string())
            }
            _ => ApiError::from(e),
        })?;

        Ok(row)
    }

    /// Fetch one tag, enforcing ownership.
    ///
    /// # Errors
    ///
    /// - `ApiError::NotFound` when no tag has this id
    /// - `ApiError::Forbidden` when the tag belongs to another user
    #[instrument(skip_all, fields(tag_id = %tag_id))]
    pub async fn fetch_owned(
        pool: &PgPool,
        tag_id: Uuid,
        user_id: Uuid,
    ) -> Result<TagRow, ApiError> {
        let row: Option<TagRow> =
            sqlx::query_as("SELECT id, user_id, name, created_at FROM tags WHERE id = $1")
                .bind(tag_id)
                .fetch_optional(pool)
                .await?;

        let row = row.ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;
        if row.user_id != user_id {
            return Err(ApiError::Forbidden(
                "You do not have access to this tag".to_string(),
            ));
        }
        Ok(row)
    }

    /// Rename a tag.
    ///
    /// # Errors
    ///
    /// - `ApiError::NotFound` when the tag vanished between the ownership
    ///   check and the update
    /// - `ApiError::BadRequest` when the new name collides
    #[instrument(skip_all, fields(tag_id = %tag_id))]
    pub async fn rename(
        pool: &PgPool,
        tag_id: Uuid,
        user_id: Uuid,
        name: &str,
    ) -> Result<TagRow, ApiError> {
        let row: Option<TagRow> = sqlx::query_as(
            "UPDATE tags SET name = $3 WHERE id = $1 AND user_id = $2 \
             RETURNING id, user_id, name, created_at",
        )
        .bind(tag_id)
        .bind(user_id)
        .bind(name)
        .fetch_optional(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::BadRequest("A tag with this name already exists".to_string())
            }
            _ => ApiError::from(e),
        })?;

        row.ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))
    }

    /// Delete a tag. Attached item links go with it (FK cascade in the
    /// hosted schema).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` on query failure.
    #[instrument(skip_all, fields(tag_id = %tag_id))]
    pub async fn delete(pool: &PgPool, tag_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM tags WHERE id = $1 AND user_id = $2")
            .bind(tag_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

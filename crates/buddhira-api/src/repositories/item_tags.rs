//! Item-tag link repository.
//!
//! Operations over the `item_tags` join table. Callers are responsible for
//! the ownership checks on both sides of a link; the helpers here scope
//! lookups by `user_id` so an unowned id simply does not exist.

use crate::errors::ApiError;
use crate::models::TagRef;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

/// Repository for item-tag link operations.
pub struct ItemTagsRepository;

impl ItemTagsRepository {
    /// Whether an item with this id belongs to the user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` on query failure.
    #[instrument(skip_all, fields(item_id = %item_id))]
    pub async fn item_belongs_to_user(
        pool: &PgPool,
        item_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, ApiError> {
        let row = sqlx::query("SELECT 1 FROM items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    /// Whether a tag with this id belongs to the user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` on query failure.
    #[instrument(skip_all, fields(tag_id = %tag_id))]
    pub async fn tag_belongs_to_user(
        pool: &PgPool,
        tag_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, ApiError> {
        let row = sqlx::query("SELECT 1 FROM tags WHERE id = $1 AND user_id = $2")
            .bind(tag_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    /// List the tags attached to one item.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` on query failure.
    #[instrument(skip_all, fields(item_id = %item_id))]
    pub async fn list_for_item(pool: &PgPool, item_id: Uuid) -> Result<Vec<TagRef>, ApiError> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT t.id, t.name \
             FROM item_tags it \
             JOIN tags t ON t.id = it.tag_id \
             WHERE it.item_id = $1 \
             ORDER BY t.name",
        )
        .bind(item_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| TagRef { id, name })
            .collect())
    }

    /// Attach a tag to an item. Idempotent: attaching twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` on query failure.
    #[instrument(skip_all, fields(item_id = %item_id, tag_id = %tag_id))]
    pub async fn attach(pool: &PgPool, item_id: Uuid, tag_id: Uuid) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO item_tags (item_id, tag_id) VALUES ($1, $2) \
             ON CONFLICT (item_id, tag_id) DO NOTHING",
        )
        .bind(item_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Detach a tag from an item. Returns whether a link was removed.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` on query failure.
    #[instrument(skip_all, fields(item_id = %item_id, tag_id = %tag_id))]
    pub async fn detach(pool: &PgPool, item_id: Uuid, tag_id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM item_tags WHERE item_id = $1 AND tag_id = $2")
            .bind(item_id)
            .bind(tag_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

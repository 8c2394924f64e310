//! Repository for the `messages` table.
//!
//! Append-only: there are intentionally no update or delete methods.

use dreamcut_core::status::MessageType;
use dreamcut_core::types::EntityId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::message::{CreateMessage, Message};

/// Column list for `messages` queries.
const MESSAGE_COLUMNS: &str = "\
    id, query_id, message_type, content, emoji, asset_id, data, created_at";

/// Provides append and read operations for narration messages.
pub struct MessageRepo;

impl MessageRepo {
    /// Append a narration message for a query.
    pub async fn append(
        pool: &PgPool,
        query_id: EntityId,
        message_type: MessageType,
        content: &str,
        opts: &CreateMessage,
    ) -> Result<Message, sqlx::Error> {
        let data = opts.data.clone().unwrap_or_else(|| serde_json::json!({}));
        let query = format!(
            "INSERT INTO messages (id, query_id, message_type, content, emoji, asset_id, data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {MESSAGE_COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(Uuid::now_v7())
            .bind(query_id)
            .bind(message_type)
            .bind(content)
            .bind(opts.emoji.as_deref())
            .bind(opts.asset_id)
            .bind(&data)
            .fetch_one(pool)
            .await
    }

    /// List all messages of a query in creation order.
    ///
    /// `id` (UUIDv7, time-ordered) breaks ties for messages created
    /// within the same timestamp tick.
    pub async fn list_by_query(
        pool: &PgPool,
        query_id: EntityId,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE query_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(query_id)
            .fetch_all(pool)
            .await
    }
}

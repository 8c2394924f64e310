//! Message models and DTOs.
//!
//! Messages are append-only narration events; there is no update DTO by
//! design.

use dreamcut_core::status::MessageType;
use dreamcut_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use ts_rs::TS;

/// A row from the `messages` table.
#[derive(Debug, Clone, FromRow, Serialize, TS)]
#[ts(export)]
pub struct Message {
    pub id: EntityId,
    pub query_id: EntityId,
    pub message_type: MessageType,
    pub content: String,
    pub emoji: Option<String>,
    pub asset_id: Option<EntityId>,
    pub data: serde_json::Value,
    pub created_at: Timestamp,
}

/// Optional fields for appending a message.
#[derive(Debug, Clone, Default)]
pub struct CreateMessage {
    pub emoji: Option<String>,
    pub asset_id: Option<EntityId>,
    pub data: Option<serde_json::Value>,
}

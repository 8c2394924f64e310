//! Query models and DTOs.

use dreamcut_core::status::{Intent, QueryStage, QueryStatus};
use dreamcut_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;

use crate::models::asset::{Asset, CreateAsset};
use crate::models::message::Message;

/// A row from the `queries` table.
#[derive(Debug, Clone, FromRow, Serialize, TS)]
#[ts(export)]
pub struct Query {
    pub id: EntityId,
    pub user_id: String,
    pub user_prompt: String,
    pub intent: Intent,
    pub options: serde_json::Value,
    pub status: QueryStatus,
    pub stage: QueryStage,
    /// Overall progress, 0–100. Monotonically non-decreasing while
    /// status is `processing` (enforced by SQL GREATEST guards).
    pub progress: i32,
    /// Final synthesized payload; present iff status is `completed`.
    pub payload: Option<serde_json::Value>,
    /// Human-readable failure; present iff status is `failed`.
    pub error_message: Option<String>,
    pub processing_time_ms: Option<i64>,
    pub models_used: Vec<String>,
    pub cost_estimate: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// DTO for creating a query together with its asset rows.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuery {
    pub user_id: String,
    pub user_prompt: String,
    pub intent: Intent,
    pub options: serde_json::Value,
    pub cost_estimate: f64,
    pub assets: Vec<CreateAsset>,
}

/// Aggregate metrics recorded when a query completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub processing_time_ms: i64,
    pub models_used: Vec<String>,
    pub cost_estimate: f64,
}

/// Point-in-time read of a query's full state.
///
/// Assets and messages are ordered by creation time.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct QuerySnapshot {
    pub query: Query,
    pub assets: Vec<Asset>,
    pub messages: Vec<Message>,
}

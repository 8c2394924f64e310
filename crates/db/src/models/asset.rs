//! Asset models and DTOs.

use dreamcut_core::analysis::AssetAnalysis;
use dreamcut_core::status::{AssetStatus, MediaType};
use dreamcut_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use ts_rs::TS;

/// A row from the `assets` table.
#[derive(Debug, Clone, FromRow, Serialize, TS)]
#[ts(export)]
pub struct Asset {
    pub id: EntityId,
    pub query_id: EntityId,
    pub url: String,
    pub filename: Option<String>,
    pub media_type: MediaType,
    pub user_description: Option<String>,
    pub file_size_bytes: i64,
    pub metadata: serde_json::Value,
    pub status: AssetStatus,
    pub progress: i32,
    /// Typed analysis result, stored as tagged JSONB.
    #[ts(as = "Option<AssetAnalysis>")]
    pub analysis: Option<Json<AssetAnalysis>>,
    /// Identifier of the worker/model instance that processed this asset.
    pub worker_id: Option<String>,
    pub model_used: Option<String>,
    pub processing_time_ms: Option<i64>,
    pub error_message: Option<String>,
    pub quality_score: Option<f32>,
    pub confidence_score: Option<f32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub analyzed_at: Option<Timestamp>,
}

/// DTO for one asset descriptor on the inbound request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAsset {
    pub url: String,
    pub filename: Option<String>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub user_description: Option<String>,
    #[serde(default)]
    pub file_size_bytes: i64,
    #[serde(default = "default_metadata")]
    pub metadata: serde_json::Value,
}

fn default_metadata() -> serde_json::Value {
    serde_json::json!({})
}

/// Patch merged into an asset row by `AssetRepo::update_progress`.
///
/// `None` fields are left untouched (COALESCE in SQL). Updates are
/// rejected once the row is terminal.
#[derive(Debug, Clone, Default)]
pub struct AssetPatch {
    pub status: Option<AssetStatus>,
    pub analysis: Option<Json<AssetAnalysis>>,
    pub worker_id: Option<String>,
    pub model_used: Option<String>,
    pub processing_time_ms: Option<i64>,
    pub error_message: Option<String>,
    pub quality_score: Option<f32>,
    pub confidence_score: Option<f32>,
}

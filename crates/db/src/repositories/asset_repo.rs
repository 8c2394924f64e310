//! Repository for the `assets` table.
//!
//! Asset rows are created alongside their query (see
//! [`QueryRepo::create_with_assets`](crate::repositories::QueryRepo::create_with_assets));
//! this repository covers reads and the guarded progress updates.
//! Updates target disjoint rows, so concurrent calls for distinct assets
//! never contend.

use dreamcut_core::types::EntityId;
use sqlx::PgPool;

use crate::models::asset::{Asset, AssetPatch};

/// Column list for `assets` queries.
const ASSET_COLUMNS: &str = "\
    id, query_id, url, filename, media_type, user_description, \
    file_size_bytes, metadata, status, progress, analysis, \
    worker_id, model_used, processing_time_ms, error_message, \
    quality_score, confidence_score, created_at, updated_at, analyzed_at";

/// Provides read and progress-update operations for assets.
pub struct AssetRepo;

impl AssetRepo {
    /// Find an asset by ID.
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1");
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all assets of a query, ordered by creation time.
    pub async fn list_by_query(
        pool: &PgPool,
        query_id: EntityId,
    ) -> Result<Vec<Asset>, sqlx::Error> {
        let query = format!(
            "SELECT {ASSET_COLUMNS} FROM assets \
             WHERE query_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(query_id)
            .fetch_all(pool)
            .await
    }

    /// Merge a patch into an asset row and set its progress.
    ///
    /// Guards:
    /// - terminal rows (`completed` / `failed`) are never mutated —
    ///   the update matches zero rows and `None` is returned;
    /// - progress never decreases (`GREATEST`);
    /// - `analyzed_at` is stamped when the patch moves the row to a
    ///   terminal status.
    pub async fn update_progress(
        pool: &PgPool,
        id: EntityId,
        progress: i32,
        patch: &AssetPatch,
    ) -> Result<Option<Asset>, sqlx::Error> {
        let reaches_terminal = patch.status.is_some_and(|s| s.is_terminal());

        let query = format!(
            "UPDATE assets \
             SET progress = GREATEST(progress, $2), \
                 status = COALESCE($3, status), \
                 analysis = COALESCE($4, analysis), \
                 worker_id = COALESCE($5, worker_id), \
                 model_used = COALESCE($6, model_used), \
                 processing_time_ms = COALESCE($7, processing_time_ms), \
                 error_message = COALESCE($8, error_message), \
                 quality_score = COALESCE($9, quality_score), \
                 confidence_score = COALESCE($10, confidence_score), \
                 analyzed_at = CASE WHEN $11 THEN now() ELSE analyzed_at END, \
                 updated_at = now() \
             WHERE id = $1 AND status IN ('pending', 'analyzing') \
             RETURNING {ASSET_COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .bind(progress)
            .bind(patch.status)
            .bind(patch.analysis.as_ref())
            .bind(patch.worker_id.as_deref())
            .bind(patch.model_used.as_deref())
            .bind(patch.processing_time_ms)
            .bind(patch.error_message.as_deref())
            .bind(patch.quality_score)
            .bind(patch.confidence_score)
            .bind(reaches_terminal)
            .fetch_optional(pool)
            .await
    }
}

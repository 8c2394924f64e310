//! Repository for the `queries` table.
//!
//! Lifecycle guards live in the SQL: progress only moves through
//! `GREATEST`, and terminal transitions require `status = 'processing'`,
//! so a query completes or fails exactly once.

use dreamcut_core::status::QueryStage;
use dreamcut_core::types::EntityId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::asset::Asset;
use crate::models::query::{CreateQuery, Query, QueryMetrics};

/// Column list for `queries` queries.
const QUERY_COLUMNS: &str = "\
    id, user_id, user_prompt, intent, options, \
    status, stage, progress, payload, error_message, \
    processing_time_ms, models_used, cost_estimate, \
    created_at, updated_at, completed_at";

/// Column list for `assets` inserts performed alongside query creation.
const ASSET_COLUMNS: &str = "\
    id, query_id, url, filename, media_type, user_description, \
    file_size_bytes, metadata, status, progress, analysis, \
    worker_id, model_used, processing_time_ms, error_message, \
    quality_score, confidence_score, created_at, updated_at, analyzed_at";

/// Provides lifecycle operations for queries.
pub struct QueryRepo;

impl QueryRepo {
    /// Atomically create one query row plus one asset row per descriptor.
    ///
    /// Runs in a single transaction so readers never observe a query
    /// without its assets (or vice versa).
    pub async fn create_with_assets(
        pool: &PgPool,
        input: &CreateQuery,
    ) -> Result<(Query, Vec<Asset>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert_query = format!(
            "INSERT INTO queries (id, user_id, user_prompt, intent, options, cost_estimate) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {QUERY_COLUMNS}"
        );
        let query = sqlx::query_as::<_, Query>(&insert_query)
            .bind(Uuid::now_v7())
            .bind(&input.user_id)
            .bind(&input.user_prompt)
            .bind(input.intent)
            .bind(&input.options)
            .bind(input.cost_estimate)
            .fetch_one(&mut *tx)
            .await?;

        let insert_asset = format!(
            "INSERT INTO assets (id, query_id, url, filename, media_type, \
                                 user_description, file_size_bytes, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ASSET_COLUMNS}"
        );
        let mut assets = Vec::with_capacity(input.assets.len());
        for descriptor in &input.assets {
            let asset = sqlx::query_as::<_, Asset>(&insert_asset)
                .bind(Uuid::now_v7())
                .bind(query.id)
                .bind(&descriptor.url)
                .bind(descriptor.filename.as_deref())
                .bind(descriptor.media_type)
                .bind(descriptor.user_description.as_deref())
                .bind(descriptor.file_size_bytes)
                .bind(&descriptor.metadata)
                .fetch_one(&mut *tx)
                .await?;
            assets.push(asset);
        }

        tx.commit().await?;
        Ok((query, assets))
    }

    /// Find a query by ID.
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<Query>, sqlx::Error> {
        let query = format!("SELECT {QUERY_COLUMNS} FROM queries WHERE id = $1");
        sqlx::query_as::<_, Query>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Advance the stage and bump progress on a processing query.
    ///
    /// Progress never decreases (`GREATEST`); returns `None` when the
    /// query is already terminal.
    pub async fn advance_stage(
        pool: &PgPool,
        id: EntityId,
        stage: QueryStage,
        progress: i32,
    ) -> Result<Option<Query>, sqlx::Error> {
        let query = format!(
            "UPDATE queries \
             SET stage = $2, progress = GREATEST(progress, $3), updated_at = now() \
             WHERE id = $1 AND status = 'processing' \
             RETURNING {QUERY_COLUMNS}"
        );
        sqlx::query_as::<_, Query>(&query)
            .bind(id)
            .bind(stage)
            .bind(progress)
            .fetch_optional(pool)
            .await
    }

    /// Record additional model identifiers used during the run.
    pub async fn record_models_used(
        pool: &PgPool,
        id: EntityId,
        models: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE queries \
             SET models_used = COALESCE(\
                 (SELECT array_agg(DISTINCT m) FROM unnest(models_used || $2) AS m), '{}'\
             ), updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(models)
        .execute(pool)
        .await
        .map(|_| ())
    }

    /// Terminal transition: processing → completed.
    ///
    /// Stores the final payload and metrics, sets stage=done and
    /// progress=100. Returns `None` when the query was not processing.
    pub async fn complete(
        pool: &PgPool,
        id: EntityId,
        payload: &serde_json::Value,
        metrics: &QueryMetrics,
    ) -> Result<Option<Query>, sqlx::Error> {
        let query = format!(
            "UPDATE queries \
             SET status = 'completed', stage = 'done', progress = 100, \
                 payload = $2, processing_time_ms = $3, models_used = $4, \
                 cost_estimate = $5, completed_at = now(), updated_at = now() \
             WHERE id = $1 AND status = 'processing' \
             RETURNING {QUERY_COLUMNS}"
        );
        sqlx::query_as::<_, Query>(&query)
            .bind(id)
            .bind(payload)
            .bind(metrics.processing_time_ms)
            .bind(&metrics.models_used)
            .bind(metrics.cost_estimate)
            .fetch_optional(pool)
            .await
    }

    /// Terminal transition: processing → failed.
    ///
    /// Returns `None` when the query was not processing (already terminal).
    pub async fn fail(
        pool: &PgPool,
        id: EntityId,
        error_message: &str,
    ) -> Result<Option<Query>, sqlx::Error> {
        let query = format!(
            "UPDATE queries \
             SET status = 'failed', error_message = $2, updated_at = now(), \
                 completed_at = now() \
             WHERE id = $1 AND status = 'processing' \
             RETURNING {QUERY_COLUMNS}"
        );
        sqlx::query_as::<_, Query>(&query)
            .bind(id)
            .bind(error_message)
            .fetch_optional(pool)
            .await
    }
}

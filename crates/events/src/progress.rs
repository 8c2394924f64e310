//! Progress store: durable entity state plus row-change notification.
//!
//! [`ProgressStore`] is the single write path for query, asset, and
//! message rows. Every successful mutation publishes exactly one
//! [`PipelineEvent`] on the shared bus, so subscribers observe
//! per-entity changes in the order the store applied them. The store
//! itself does not know who is subscribed.

use std::sync::Arc;

use dreamcut_core::status::{MessageType, QueryStage};
use dreamcut_core::types::EntityId;
use dreamcut_db::models::{
    Asset, AssetPatch, CreateMessage, CreateQuery, Message, Query, QueryMetrics, QuerySnapshot,
};
use dreamcut_db::repositories::{AssetRepo, MessageRepo, QueryRepo};
use dreamcut_db::DbPool;

use crate::bus::{EventBus, PipelineEvent};

/// Persistence facade coupling row mutations to event publishes.
///
/// Cheap to clone; constructed once at process start and passed by
/// reference to the orchestrator and API handlers (no global client
/// singletons).
#[derive(Clone)]
pub struct ProgressStore {
    pool: DbPool,
    bus: Arc<EventBus>,
}

impl ProgressStore {
    /// Create a store over the given pool and event bus.
    pub fn new(pool: DbPool, bus: Arc<EventBus>) -> Self {
        Self { pool, bus }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// The event bus mutations are published on.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Atomically create a query row plus one asset row per descriptor.
    ///
    /// The insert runs in one transaction, so no partial-row state is
    /// ever observable. Publishes one query event and one event per
    /// asset after the commit.
    pub async fn create_query(
        &self,
        input: &CreateQuery,
    ) -> Result<(Query, Vec<Asset>), sqlx::Error> {
        let (query, assets) = QueryRepo::create_with_assets(&self.pool, input).await?;

        self.bus.publish(PipelineEvent::QueryUpdated {
            query_id: query.id,
            query: query.clone(),
        });
        for asset in &assets {
            self.bus.publish(PipelineEvent::AssetUpdated {
                query_id: query.id,
                asset: asset.clone(),
            });
        }

        Ok((query, assets))
    }

    /// Advance the stage / bump progress of a processing query.
    ///
    /// Returns `None` (and publishes nothing) when the query is already
    /// terminal.
    pub async fn advance_stage(
        &self,
        query_id: EntityId,
        stage: QueryStage,
        progress: i32,
    ) -> Result<Option<Query>, sqlx::Error> {
        let updated = QueryRepo::advance_stage(&self.pool, query_id, stage, progress).await?;
        if let Some(query) = &updated {
            self.bus.publish(PipelineEvent::QueryUpdated {
                query_id,
                query: query.clone(),
            });
        }
        Ok(updated)
    }

    /// Merge a patch into an asset row and set its progress.
    ///
    /// Safe to call concurrently for distinct assets (disjoint rows).
    /// Returns `None` when the asset is already terminal.
    pub async fn update_asset_progress(
        &self,
        asset_id: EntityId,
        progress: i32,
        patch: &AssetPatch,
    ) -> Result<Option<Asset>, sqlx::Error> {
        let updated = AssetRepo::update_progress(&self.pool, asset_id, progress, patch).await?;
        if let Some(asset) = &updated {
            self.bus.publish(PipelineEvent::AssetUpdated {
                query_id: asset.query_id,
                asset: asset.clone(),
            });
        }
        Ok(updated)
    }

    /// Terminal transition: processing → completed, storing the payload
    /// and aggregate metrics. Returns `None` if the query was not
    /// processing.
    pub async fn complete_query(
        &self,
        query_id: EntityId,
        payload: &serde_json::Value,
        metrics: &QueryMetrics,
    ) -> Result<Option<Query>, sqlx::Error> {
        let updated = QueryRepo::complete(&self.pool, query_id, payload, metrics).await?;
        if let Some(query) = &updated {
            self.bus.publish(PipelineEvent::QueryUpdated {
                query_id,
                query: query.clone(),
            });
        }
        Ok(updated)
    }

    /// Terminal transition: processing → failed with a human-readable
    /// message. Returns `None` if the query was not processing.
    pub async fn fail_query(
        &self,
        query_id: EntityId,
        error_message: &str,
    ) -> Result<Option<Query>, sqlx::Error> {
        let updated = QueryRepo::fail(&self.pool, query_id, error_message).await?;
        if let Some(query) = &updated {
            self.bus.publish(PipelineEvent::QueryUpdated {
                query_id,
                query: query.clone(),
            });
        }
        Ok(updated)
    }

    /// Record model identifiers against a query as they are used.
    ///
    /// Metadata-only update: it carries no progress, so no event is
    /// published. The final aggregate still lands in the completion
    /// metrics.
    pub async fn record_models_used(
        &self,
        query_id: EntityId,
        models: &[String],
    ) -> Result<(), sqlx::Error> {
        QueryRepo::record_models_used(&self.pool, query_id, models).await
    }

    /// Append a narration message.
    ///
    /// Write failures surface to the caller; the store never swallows
    /// them.
    pub async fn add_message(
        &self,
        query_id: EntityId,
        message_type: MessageType,
        content: &str,
        opts: &CreateMessage,
    ) -> Result<Message, sqlx::Error> {
        let message =
            MessageRepo::append(&self.pool, query_id, message_type, content, opts).await?;
        self.bus.publish(PipelineEvent::MessageAdded {
            query_id,
            message: message.clone(),
        });
        Ok(message)
    }

    /// Point-in-time read of a query's full state, assets and messages
    /// ordered by creation time.
    pub async fn get_query(
        &self,
        query_id: EntityId,
    ) -> Result<Option<QuerySnapshot>, sqlx::Error> {
        let Some(query) = QueryRepo::find_by_id(&self.pool, query_id).await? else {
            return Ok(None);
        };
        let assets = AssetRepo::list_by_query(&self.pool, query_id).await?;
        let messages = MessageRepo::list_by_query(&self.pool, query_id).await?;
        Ok(Some(QuerySnapshot {
            query,
            assets,
            messages,
        }))
    }
}

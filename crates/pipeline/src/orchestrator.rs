//! The staged pipeline run for one query.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dreamcut_core::analysis::AssetDescriptor;
use dreamcut_core::cost;
use dreamcut_core::script::{self, DEFAULT_PROFILE};
use dreamcut_core::status::{AssetStatus, Intent, MessageType, QueryStage};
use dreamcut_core::synthesis::{self, AnalyzedAsset, SynthesisInput, SynthesisResult};
use dreamcut_core::types::EntityId;
use dreamcut_db::models::{Asset, AssetPatch, CreateMessage, Query};
use dreamcut_events::ProgressStore;
use dreamcut_model::AnalysisModel;
use sqlx::types::Json;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::error::StageError;
use crate::retry::with_retry;

// Overall query progress checkpoints. The asset fan-out fills the band
// between ANALYSIS_BAND_START and ANALYSIS_BAND_END proportionally to
// finished assets; completion jumps to 100.
const PROGRESS_STARTED: i32 = 5;
const ANALYSIS_BAND_START: i32 = 15;
const ANALYSIS_BAND_END: i32 = 70;
const PROGRESS_MERGING: i32 = 75;
const PROGRESS_SCRIPTING: i32 = 90;

/// Per-asset analysis outcome handed back from a worker task.
struct AssetOutcome {
    analyzed: Option<AnalyzedAsset>,
}

/// Drives one query through analysis, merge, and script generation.
///
/// Holds its collaborators explicitly; one orchestrator is shared by
/// all runs and every run is parameterized by a query id plus its own
/// cancellation token.
pub struct Orchestrator {
    store: ProgressStore,
    model: Arc<dyn AnalysisModel>,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(store: ProgressStore, model: Arc<dyn AnalysisModel>, config: PipelineConfig) -> Self {
        Self {
            store,
            model,
            config,
        }
    }

    /// Run the pipeline to a terminal state.
    ///
    /// Absorbs stage errors into the `failed` terminal state; the only
    /// way this returns `Err` is when even the failure transition could
    /// not be persisted.
    pub async fn run(
        &self,
        query_id: EntityId,
        cancel: CancellationToken,
    ) -> Result<(), sqlx::Error> {
        match self.drive(query_id, &cancel).await {
            Ok(()) => Ok(()),
            Err(StageError::Persistence(err)) => {
                error!(%query_id, %err, "pipeline aborted on persistence failure");
                // Best-effort terminal transition; the pool may be gone.
                let _ = self.store.fail_query(query_id, "internal storage failure").await;
                Err(err)
            }
            Err(stage_err) => {
                warn!(%query_id, %stage_err, "pipeline run failed");
                let failed = self.store.fail_query(query_id, &stage_err.to_string()).await?;
                if failed.is_some() {
                    self.store
                        .add_message(
                            query_id,
                            MessageType::Error,
                            &format!("Something went wrong: {stage_err}"),
                            &CreateMessage {
                                emoji: Some("❌".to_string()),
                                ..Default::default()
                            },
                        )
                        .await?;
                }
                Ok(())
            }
        }
    }

    async fn drive(&self, query_id: EntityId, cancel: &CancellationToken) -> Result<(), StageError> {
        let started = Instant::now();
        let Some(snapshot) = self.store.get_query(query_id).await? else {
            return Err(StageError::Validation(format!("unknown query {query_id}")));
        };
        let query = snapshot.query;
        if query.status.is_terminal() {
            warn!(%query_id, "pipeline started for a terminal query; nothing to do");
            return Ok(());
        }

        // Stage 1: query analysis.
        self.advance(query_id, QueryStage::Analyzing, PROGRESS_STARTED).await?;
        self.narrate(
            query_id,
            MessageType::Status,
            "Reading your request and planning the analysis",
            Some("🎬"),
            None,
        )
        .await?;
        self.ensure_active(cancel)?;

        let query_analysis = tokio::select! {
            _ = cancel.cancelled() => return Err(StageError::Cancelled),
            res = with_retry(&self.config.retry, || async {
                self.model
                    .analyze_query(&query.user_prompt, query.intent)
                    .await
                    .map_err(|e| StageError::from_model(e, "query analysis"))
            }) => res?,
        };
        self.store
            .record_models_used(query_id, &[self.model.query_model_name().to_string()])
            .await?;
        self.advance(query_id, QueryStage::Analyzing, ANALYSIS_BAND_START).await?;
        self.narrate(
            query_id,
            MessageType::Status,
            &format!(
                "Request reads as a {} production with {} subject(s)",
                query_analysis.detected_intent,
                query_analysis.subjects.len()
            ),
            Some("🧠"),
            None,
        )
        .await?;

        // Stage 2: bounded per-asset fan-out, waiting for all of them.
        self.ensure_active(cancel)?;
        let total = snapshot.assets.len();
        let mut models_used = vec![self.model.query_model_name().to_string()];
        models_used.extend(
            snapshot
                .assets
                .iter()
                .map(|a| self.model.asset_model_name(a.media_type).to_string()),
        );
        let analyzed = self.analyze_assets(query_id, snapshot.assets, cancel).await?;
        self.ensure_active(cancel)?;

        if analyzed.len() < self.config.min_successful_assets {
            return Err(StageError::BelowAssetThreshold {
                succeeded: analyzed.len(),
                total,
                required: self.config.min_successful_assets,
            });
        }

        // Stage 3: synthesis.
        self.advance(query_id, QueryStage::Merging, PROGRESS_MERGING).await?;
        self.narrate(
            query_id,
            MessageType::Merge,
            &format!(
                "Combining the request with {} analyzed asset(s) into one plan",
                analyzed.len()
            ),
            Some("🔀"),
            None,
        )
        .await?;

        let synthesis = synthesis::synthesize(&SynthesisInput {
            declared_intent: query.intent,
            query: &query_analysis,
            assets: &analyzed,
        });
        self.narrate_findings(query_id, &synthesis).await?;

        // Stage 4: narration script for time-based productions.
        let script = if matches!(synthesis.unified_intent.intent, Intent::Video | Intent::Mixed) {
            self.advance(query_id, QueryStage::Merging, PROGRESS_SCRIPTING).await?;
            let profile = query
                .options
                .get("profile")
                .and_then(|v| v.as_str())
                .unwrap_or(DEFAULT_PROFILE);
            let script = script::generate_script(&synthesis, profile);
            self.narrate(
                query_id,
                MessageType::Status,
                &format!(
                    "Drafted a {}-scene narration in the {} profile",
                    script.scene_count, script.profile
                ),
                Some("✍️"),
                None,
            )
            .await?;
            Some(script)
        } else {
            None
        };

        self.ensure_active(cancel)?;
        self.complete(query_id, &query, total, models_used, synthesis, script, started)
            .await
    }

    /// Fan per-asset analysis out over the bounded pool and wait for
    /// every asset to reach a terminal state.
    async fn analyze_assets(
        &self,
        query_id: EntityId,
        assets: Vec<Asset>,
        cancel: &CancellationToken,
    ) -> Result<Vec<AnalyzedAsset>, StageError> {
        let total = assets.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_analyses));
        let mut join_set: JoinSet<Result<AssetOutcome, StageError>> = JoinSet::new();

        let mut attempted_media = Vec::with_capacity(total);
        for asset in assets {
            attempted_media.push(asset.media_type);
            let store = self.store.clone();
            let model = Arc::clone(&self.model);
            let retry = self.config.retry.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| StageError::Cancelled)?;
                analyze_one(&store, model.as_ref(), &retry, asset, &cancel).await
            });
        }

        let models: Vec<String> = attempted_media
            .iter()
            .map(|m| self.model.asset_model_name(*m).to_string())
            .collect();
        self.store.record_models_used(query_id, &models).await?;

        let mut analyzed = Vec::new();
        let mut finished = 0usize;
        while let Some(joined) = join_set.join_next().await {
            finished += 1;
            match joined {
                Ok(Ok(outcome)) => analyzed.extend(outcome.analyzed),
                Ok(Err(StageError::Persistence(err))) => return Err(err.into()),
                Ok(Err(err)) => warn!(%query_id, %err, "asset analysis task failed"),
                Err(join_err) => warn!(%query_id, %join_err, "asset analysis task panicked"),
            }
            let span = (ANALYSIS_BAND_END - ANALYSIS_BAND_START) as usize;
            let progress = ANALYSIS_BAND_START + (span * finished / total) as i32;
            self.advance(query_id, QueryStage::Analyzing, progress).await?;
        }

        Ok(analyzed)
    }

    #[allow(clippy::too_many_arguments)]
    async fn complete(
        &self,
        query_id: EntityId,
        query: &Query,
        asset_count: usize,
        models: Vec<String>,
        synthesis: SynthesisResult,
        script: Option<dreamcut_core::script::ScriptResult>,
        started: Instant,
    ) -> Result<(), StageError> {
        let elapsed_ms = (Utc::now() - query.created_at).num_milliseconds();

        let payload = serde_json::json!({
            "synthesis": synthesis,
            "script": script,
        });
        let metrics = dreamcut_db::models::QueryMetrics {
            processing_time_ms: elapsed_ms.max(started.elapsed().as_millis() as i64),
            models_used: cost::dedup_models_used(models),
            cost_estimate: cost::estimate_cost(asset_count),
        };

        let completed = self.store.complete_query(query_id, &payload, &metrics).await?;
        if completed.is_none() {
            // Terminal state raced us (cancel endpoint); nothing to undo.
            return Err(StageError::Cancelled);
        }

        info!(%query_id, elapsed_ms = metrics.processing_time_ms, "pipeline run completed");
        self.narrate(
            query_id,
            MessageType::Final,
            "Your creative brief is ready",
            Some("✅"),
            None,
        )
        .await?;
        Ok(())
    }

    /// Emit narration for synthesis findings: one message per conflict
    /// and one suggestion per gap.
    async fn narrate_findings(
        &self,
        query_id: EntityId,
        synthesis: &SynthesisResult,
    ) -> Result<(), StageError> {
        for conflict in &synthesis.conflicts {
            self.narrate(
                query_id,
                MessageType::Conflict,
                &format!("{} — {}", conflict.description, conflict.resolution),
                Some("⚠️"),
                None,
            )
            .await?;
        }
        for gap in &synthesis.gaps {
            self.narrate(
                query_id,
                MessageType::Suggestion,
                &gap.description,
                Some("💡"),
                None,
            )
            .await?;
        }
        Ok(())
    }

    async fn advance(
        &self,
        query_id: EntityId,
        stage: QueryStage,
        progress: i32,
    ) -> Result<(), StageError> {
        match self.store.advance_stage(query_id, stage, progress).await? {
            Some(_) => Ok(()),
            // Only an external terminal transition makes this fail.
            None => Err(StageError::Cancelled),
        }
    }

    async fn narrate(
        &self,
        query_id: EntityId,
        message_type: MessageType,
        content: &str,
        emoji: Option<&str>,
        asset_id: Option<EntityId>,
    ) -> Result<(), StageError> {
        self.store
            .add_message(
                query_id,
                message_type,
                content,
                &CreateMessage {
                    emoji: emoji.map(str::to_string),
                    asset_id,
                    data: None,
                },
            )
            .await?;
        Ok(())
    }

    fn ensure_active(&self, cancel: &CancellationToken) -> Result<(), StageError> {
        if cancel.is_cancelled() {
            Err(StageError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Analyze one asset to a terminal row state.
///
/// Model failures are absorbed here: the asset row lands on `failed`
/// with its error message and the run carries on. Only persistence
/// failures propagate.
async fn analyze_one(
    store: &ProgressStore,
    model: &dyn AnalysisModel,
    retry: &crate::config::RetryConfig,
    asset: Asset,
    cancel: &CancellationToken,
) -> Result<AssetOutcome, StageError> {
    let started = Instant::now();
    let label = asset.filename.clone().unwrap_or_else(|| asset.url.clone());

    if cancel.is_cancelled() {
        finish_failed(store, &asset, "analysis cancelled", started).await?;
        return Ok(AssetOutcome { analyzed: None });
    }

    store
        .update_asset_progress(
            asset.id,
            10,
            &AssetPatch {
                status: Some(AssetStatus::Analyzing),
                worker_id: Some(format!("analyzer-{}", tokio::task::id())),
                ..Default::default()
            },
        )
        .await?;
    store
        .add_message(
            asset.query_id,
            MessageType::AssetStart,
            &format!("Looking at {label}"),
            &CreateMessage {
                emoji: Some("🔍".to_string()),
                asset_id: Some(asset.id),
                data: None,
            },
        )
        .await?;

    let descriptor = AssetDescriptor {
        url: asset.url.clone(),
        filename: asset.filename.clone(),
        media_type: asset.media_type,
        user_description: asset.user_description.clone(),
        file_size_bytes: asset.file_size_bytes,
        metadata: asset.metadata.clone(),
    };

    let result = tokio::select! {
        _ = cancel.cancelled() => Err(StageError::Cancelled),
        res = with_retry(retry, || async {
            model
                .analyze_asset(&descriptor)
                .await
                .map_err(|e| StageError::from_model(e, "asset analysis"))
        }) => res,
    };

    match result {
        Ok(analysis) => {
            store
                .update_asset_progress(asset.id, 60, &AssetPatch::default())
                .await?;
            store
                .add_message(
                    asset.query_id,
                    MessageType::AssetProgress,
                    &format!("Interpreting what we found in {label}"),
                    &CreateMessage {
                        emoji: None,
                        asset_id: Some(asset.id),
                        data: None,
                    },
                )
                .await?;

            let quality = analysis.quality_score();
            store
                .update_asset_progress(
                    asset.id,
                    100,
                    &AssetPatch {
                        status: Some(AssetStatus::Completed),
                        analysis: Some(Json(analysis.clone())),
                        model_used: Some(model.asset_model_name(asset.media_type).to_string()),
                        processing_time_ms: Some(started.elapsed().as_millis() as i64),
                        quality_score: Some(quality),
                        ..Default::default()
                    },
                )
                .await?;
            store
                .add_message(
                    asset.query_id,
                    MessageType::AssetComplete,
                    &format!("Finished analyzing {label}"),
                    &CreateMessage {
                        emoji: Some("✅".to_string()),
                        asset_id: Some(asset.id),
                        data: None,
                    },
                )
                .await?;
            Ok(AssetOutcome {
                analyzed: Some(AnalyzedAsset {
                    asset_id: asset.id,
                    analysis,
                }),
            })
        }
        Err(StageError::Persistence(err)) => Err(err.into()),
        Err(err) => {
            finish_failed(store, &asset, &err.to_string(), started).await?;
            Ok(AssetOutcome { analyzed: None })
        }
    }
}

/// Terminal `failed` transition for one asset, with its error message.
async fn finish_failed(
    store: &ProgressStore,
    asset: &Asset,
    reason: &str,
    started: Instant,
) -> Result<(), StageError> {
    store
        .update_asset_progress(
            asset.id,
            100,
            &AssetPatch {
                status: Some(AssetStatus::Failed),
                error_message: Some(reason.to_string()),
                processing_time_ms: Some(started.elapsed().as_millis() as i64),
                ..Default::default()
            },
        )
        .await?;
    let label = asset.filename.as_deref().unwrap_or(&asset.url);
    store
        .add_message(
            asset.query_id,
            MessageType::Error,
            &format!("Could not analyze {label}: {reason}"),
            &CreateMessage {
                emoji: Some("⚠️".to_string()),
                asset_id: Some(asset.id),
                data: None,
            },
        )
        .await?;
    Ok(())
}

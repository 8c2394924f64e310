//! The analysis seam between the pipeline and hosted models.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use dreamcut_core::analysis::{AssetAnalysis, AssetDescriptor, QueryAnalysis};
use dreamcut_core::status::{Intent, MediaType};
use tracing::debug;

use crate::api::{ModelApi, ModelApiError};
use crate::{parse, prompts};

/// Model names and timeouts for the analysis stages.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub query_model: String,
    pub image_model: String,
    pub video_model: String,
    pub audio_model: String,
    /// Per-call timeout for one inference request.
    pub call_timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8200".to_string(),
            api_key: None,
            query_model: "intent-planner-1".to_string(),
            image_model: "vision-analyzer-1".to_string(),
            video_model: "vision-analyzer-1".to_string(),
            audio_model: "speech-analyzer-1".to_string(),
            call_timeout: Duration::from_secs(60),
        }
    }
}

impl ModelConfig {
    /// Build the config from environment variables, with defaults for
    /// anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("MODEL_API_URL").unwrap_or(defaults.base_url),
            api_key: env::var("MODEL_API_KEY").ok(),
            query_model: env::var("QUERY_MODEL").unwrap_or(defaults.query_model),
            image_model: env::var("IMAGE_MODEL").unwrap_or(defaults.image_model),
            video_model: env::var("VIDEO_MODEL").unwrap_or(defaults.video_model),
            audio_model: env::var("AUDIO_MODEL").unwrap_or(defaults.audio_model),
            call_timeout: env::var("MODEL_CALL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.call_timeout),
        }
    }

    fn model_for(&self, media: MediaType) -> &str {
        match media {
            MediaType::Image => &self.image_model,
            MediaType::Video => &self.video_model,
            MediaType::Audio => &self.audio_model,
        }
    }
}

/// Trait seam for the model-backed analysis stages.
///
/// The orchestrator only sees this trait; tests swap in fakes.
#[async_trait]
pub trait AnalysisModel: Send + Sync {
    /// Stage 1: analyze the user's request text.
    async fn analyze_query(
        &self,
        user_prompt: &str,
        declared_intent: Intent,
    ) -> Result<QueryAnalysis, ModelApiError>;

    /// Stage 2: analyze one asset.
    async fn analyze_asset(
        &self,
        descriptor: &AssetDescriptor,
    ) -> Result<AssetAnalysis, ModelApiError>;

    /// Name of the model behind [`Self::analyze_query`], for metrics.
    fn query_model_name(&self) -> &str;

    /// Name of the model used for assets of the given media type.
    fn asset_model_name(&self, media: MediaType) -> &str;
}

/// Production [`AnalysisModel`] over the hosted inference endpoint.
pub struct RemoteAnalyzer {
    api: ModelApi,
    config: ModelConfig,
}

impl RemoteAnalyzer {
    pub fn new(config: ModelConfig) -> Self {
        let api = ModelApi::new(config.base_url.clone(), config.api_key.clone());
        Self { api, config }
    }
}

#[async_trait]
impl AnalysisModel for RemoteAnalyzer {
    async fn analyze_query(
        &self,
        user_prompt: &str,
        declared_intent: Intent,
    ) -> Result<QueryAnalysis, ModelApiError> {
        let prompt = prompts::query_analysis_prompt(user_prompt, declared_intent);
        debug!(model = %self.config.query_model, "running query analysis");
        let output = self
            .api
            .infer(&self.config.query_model, &prompt, self.config.call_timeout)
            .await?;
        parse::parse_query_analysis(output)
    }

    async fn analyze_asset(
        &self,
        descriptor: &AssetDescriptor,
    ) -> Result<AssetAnalysis, ModelApiError> {
        let model = self.config.model_for(descriptor.media_type);
        let prompt = prompts::asset_analysis_prompt(descriptor);
        debug!(model, url = %descriptor.url, "running asset analysis");
        let output = self
            .api
            .infer(model, &prompt, self.config.call_timeout)
            .await?;
        parse::parse_asset_analysis(output, descriptor.media_type)
    }

    fn query_model_name(&self) -> &str {
        &self.config.query_model
    }

    fn asset_model_name(&self, media: MediaType) -> &str {
        self.config.model_for(media)
    }
}

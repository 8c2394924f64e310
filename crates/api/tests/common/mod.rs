use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use dreamcut_api::config::ServerConfig;
use dreamcut_api::notifications::RealtimeNotifier;
use dreamcut_api::router::build_app_router;
use dreamcut_api::state::{AppState, CancellationRegistry};
use dreamcut_api::ws::WsManager;
use dreamcut_core::analysis::{AssetAnalysis, AssetDescriptor, ImageAnalysis, QueryAnalysis};
use dreamcut_core::status::{Intent, MediaType};
use dreamcut_events::{EventBus, ProgressStore};
use dreamcut_model::{AnalysisModel, ModelApiError};
use dreamcut_pipeline::{Orchestrator, PipelineConfig, RetryConfig};

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
    }
}

/// Instant in-process stand-in for the hosted analysis models.
///
/// `analysis_delay` lets cancellation tests hold a run open long enough
/// to cancel it; `panics` simulates a crashed model client.
pub struct FakeModel {
    pub analysis_delay: Duration,
    pub panics: bool,
}

impl FakeModel {
    pub fn instant() -> Self {
        Self {
            analysis_delay: Duration::ZERO,
            panics: false,
        }
    }

    pub fn slow(analysis_delay: Duration) -> Self {
        Self {
            analysis_delay,
            panics: false,
        }
    }

    pub fn panicking() -> Self {
        Self {
            analysis_delay: Duration::ZERO,
            panics: true,
        }
    }
}

#[async_trait]
impl AnalysisModel for FakeModel {
    async fn analyze_query(
        &self,
        _user_prompt: &str,
        declared_intent: Intent,
    ) -> Result<QueryAnalysis, ModelApiError> {
        if self.panics {
            panic!("model client crashed");
        }
        tokio::time::sleep(self.analysis_delay).await;
        Ok(QueryAnalysis {
            detected_intent: declared_intent,
            subjects: vec!["the subject".to_string()],
            modifiers: vec![],
            style: Some("cinematic".to_string()),
            target_duration_secs: Some(30.0),
            wants_voiceover: false,
            confidence: 0.9,
        })
    }

    async fn analyze_asset(
        &self,
        _descriptor: &AssetDescriptor,
    ) -> Result<AssetAnalysis, ModelApiError> {
        tokio::time::sleep(self.analysis_delay).await;
        Ok(AssetAnalysis::Image(ImageAnalysis {
            caption: "a frame".to_string(),
            objects: vec![],
            style_tags: vec![],
            width: Some(1280),
            height: Some(720),
            quality_score: 0.8,
        }))
    }

    fn query_model_name(&self) -> &str {
        "fake-intent-1"
    }

    fn asset_model_name(&self, _media: MediaType) -> &str {
        "fake-vision-1"
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool and a scripted model.
///
/// This mirrors the wiring in `main.rs` so integration tests exercise the
/// same middleware stack (CORS, request ID, timeout, tracing, panic
/// recovery) that production uses. The realtime notifier runs too, so
/// subscribed WebSocket clients would receive frames.
pub fn build_test_app_with_model(pool: PgPool, model: Arc<dyn AnalysisModel>) -> Router {
    let config = test_config();
    let ws_manager = Arc::new(WsManager::new());
    let event_bus = Arc::new(EventBus::default());
    let store = ProgressStore::new(pool, Arc::clone(&event_bus));

    tokio::spawn(RealtimeNotifier::new(Arc::clone(&ws_manager)).run(event_bus.subscribe()));

    let pipeline_config = PipelineConfig {
        retry: RetryConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryConfig::default()
        },
        ..PipelineConfig::default()
    };
    let orchestrator = Arc::new(Orchestrator::new(store.clone(), model, pipeline_config));

    let state = AppState {
        store,
        config: Arc::new(config.clone()),
        ws_manager,
        orchestrator,
        cancellations: Arc::new(CancellationRegistry::default()),
    };

    build_app_router(state, &config)
}

/// Build the test app with an instant fake model.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_model(pool, Arc::new(FakeModel::instant()))
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Issue a POST request with a JSON body against the app.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll the snapshot endpoint until the query leaves `processing`.
///
/// The pipeline runs on a spawned task, so tests wait for the terminal
/// state instead of racing it.
pub async fn wait_for_terminal(app: &Router, query_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let response = get(app.clone(), &format!("/api/v1/queries/{query_id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        if json["data"]["query"]["status"] != "processing" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("query {query_id} never reached a terminal state");
}

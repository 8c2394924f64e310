//! Handlers for query submission, snapshots, and cancellation.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use dreamcut_core::cost;
use dreamcut_core::error::CoreError;
use dreamcut_core::status::Intent;
use dreamcut_core::types::EntityId;
use dreamcut_db::models::{CreateAsset, CreateQuery, QuerySnapshot};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Inbound body for `POST /api/v1/queries`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQueryRequest {
    /// The user's creative request text.
    #[validate(length(min = 1, max = 5000, message = "query must be 1-5000 characters"))]
    pub query: String,
    #[validate(length(min = 1, message = "user_id is required"))]
    pub user_id: String,
    /// Asset descriptors to analyze alongside the request.
    #[serde(default)]
    #[validate(length(max = 20, message = "at most 20 assets per query"))]
    pub assets: Vec<CreateAsset>,
    /// Declared intent; the pipeline detects one from the text when omitted.
    #[serde(default)]
    pub intent: Option<Intent>,
    /// Free-form options (e.g. `{"profile": "documentary"}`).
    #[serde(default)]
    pub options: Option<serde_json::Value>,
}

/// POST /api/v1/queries -- create the query and its asset rows, spawn
/// the pipeline, and return 202 with the realtime channel names.
pub async fn create_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateQueryRequest>,
) -> AppResult<Response> {
    if let Err(errors) = payload.validate() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": flatten_validation_errors(&errors),
                "error_code": "VALIDATION_ERROR",
            })),
        )
            .into_response());
    }

    let input = CreateQuery {
        user_id: payload.user_id,
        user_prompt: payload.query,
        // A declared intent is optional; mixed lets the detected intent
        // drive the unified direction without a disagreement conflict.
        intent: payload.intent.unwrap_or(Intent::Mixed),
        options: payload.options.unwrap_or_else(|| json!({})),
        cost_estimate: cost::estimate_cost(payload.assets.len()),
        assets: payload.assets,
    };

    let (query, assets) = state.store.create_query(&input).await?;
    tracing::info!(query_id = %query.id, assets = assets.len(), "Query created");

    // Spawn the pipeline run with its own cancellation token; the token
    // is dropped from the registry once the run is terminal. The run is
    // isolated in its own task so even a panic reaches the cleanup.
    let token = state.cancellations.register(query.id).await;
    let orchestrator = Arc::clone(&state.orchestrator);
    let cancellations = Arc::clone(&state.cancellations);
    let store = state.store.clone();
    let query_id = query.id;
    tokio::spawn(async move {
        let run = tokio::spawn(async move { orchestrator.run(query_id, token).await });
        match run.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(%query_id, error = %e, "Pipeline run could not persist its outcome");
            }
            Err(join_err) => {
                tracing::error!(%query_id, error = %join_err, "Pipeline run aborted");
                let _ = store.fail_query(query_id, "internal pipeline failure").await;
            }
        }
        cancellations.remove(query_id).await;
    });

    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "query_id": query.id,
            "request_id": request_id,
            "realtime_channels": [
                format!("query:{}", query.id),
                format!("asset:{}", query.id),
                format!("message:{}", query.id),
            ],
        })),
    )
        .into_response())
}

/// GET /api/v1/queries/{id} -- full point-in-time snapshot.
pub async fn get_query(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<QuerySnapshot>>> {
    let snapshot = state
        .store
        .get_query(id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "query",
            id,
        })?;
    Ok(Json(DataResponse { data: snapshot }))
}

/// POST /api/v1/queries/{id}/cancel -- cancel an in-flight run.
///
/// 404 when the query is unknown or already terminal (its token is gone
/// either way).
pub async fn cancel_query(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Response> {
    if !state.cancellations.cancel(id).await {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "query",
            id,
        }));
    }
    tracing::info!(query_id = %id, "Cancellation requested");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "data": { "cancelled": true } })),
    )
        .into_response())
}

/// Flatten validator's error map into one human-readable line.
fn flatten_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"))
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

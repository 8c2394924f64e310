pub mod health;
pub mod queries;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                          WebSocket (subscription protocol)
///
/// /queries                     submit query (POST, 202)
/// /queries/{id}                full snapshot (GET)
/// /queries/{id}/cancel         cancel in-flight run (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket endpoint for realtime progress frames.
        .route("/ws", get(ws::ws_handler))
        // Query lifecycle.
        .nest("/queries", queries::router())
}

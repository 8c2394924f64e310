use axum::routing::{get, post};
use axum::Router;

use crate::handlers::queries;
use crate::state::AppState;

/// Build the `/queries` route tree.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(queries::create_query))
        .route("/{id}", get(queries::get_query))
        .route("/{id}/cancel", post(queries::cancel_query))
}

pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /status          accelerator state, backlog, models (GET)
/// /jobs            submit a chat or image job (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(handlers::status::get_status))
        .route("/jobs", post(handlers::jobs::submit_job))
}

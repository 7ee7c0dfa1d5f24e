pub mod health;
pub mod jobs;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /submit              submit a job (POST)
/// /status/{id}         poll a job (GET)
/// /cancel/{id}         cancel a job (POST)
/// /stats               usage statistics (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(jobs::router())
        .route("/stats", get(handlers::stats::get_stats))
}

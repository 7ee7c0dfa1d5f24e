//! Route definitions for the job-processing surface.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at the API root.
///
/// ```text
/// POST   /submit          -> submit_job
/// GET    /status/{id}     -> job_status
/// POST   /cancel/{id}     -> cancel_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/submit", post(jobs::submit_job))
        .route("/status/{id}", get(jobs::job_status))
        .route("/cancel/{id}", post(jobs::cancel_job))
}

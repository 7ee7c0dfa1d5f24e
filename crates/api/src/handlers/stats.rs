//! Handler for the usage statistics resource.

use axum::extract::State;
use axum::Json;
use texgen_stats::UsageStats;

use crate::state::AppState;

/// GET /api/v1/stats
///
/// Current usage record: total processed count, last-processed
/// timestamp, and per-day completion counts.
pub async fn get_stats(State(state): State<AppState>) -> Json<UsageStats> {
    Json(state.stats.snapshot().await)
}

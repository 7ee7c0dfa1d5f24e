use std::sync::Arc;

use texgen_scheduler::JobBoard;
use texgen_stats::StatsSink;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable -- everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Admission queue + job registry.
    pub board: Arc<JobBoard>,
    /// Durable usage statistics.
    pub stats: Arc<StatsSink>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

use std::path::PathBuf;
use std::time::Duration;

use texgen_core::stages;
use texgen_scheduler::board::{DEFAULT_QUEUE_CAPACITY, DEFAULT_RESULT_TTL};

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables. Everything here
/// is fixed at process start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Maximum number of pending jobs in the admission queue.
    pub queue_capacity: usize,
    /// How long an uncollected result stays readable before eviction.
    pub result_ttl: Duration,
    /// Stage names in execution order.
    pub stages: Vec<String>,
    /// Base URL of the model-serving backend.
    pub engine_url: String,
    /// Location of the persisted usage statistics file.
    pub stats_path: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                                     |
    /// |------------------------|---------------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                                   |
    /// | `PORT`                 | `8000`                                      |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`                     |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                        |
    /// | `QUEUE_CAPACITY`       | `50`                                        |
    /// | `RESULT_TTL_SECS`      | `120`                                       |
    /// | `STAGES`               | `Albedo,Normal,Height,Roughness,Metallic`   |
    /// | `ENGINE_URL`           | `http://127.0.0.1:8090`                     |
    /// | `STATS_PATH`           | `usage_stats.json`                          |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let queue_capacity: usize = std::env::var("QUEUE_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_QUEUE_CAPACITY.to_string())
            .parse()
            .expect("QUEUE_CAPACITY must be a valid usize");

        let result_ttl_secs: u64 = std::env::var("RESULT_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_RESULT_TTL.as_secs().to_string())
            .parse()
            .expect("RESULT_TTL_SECS must be a valid u64");

        let stages = match std::env::var("STAGES") {
            Ok(raw) => stages::parse_stage_list(&raw)
                .unwrap_or_else(|e| panic!("Invalid STAGES: {e}")),
            Err(_) => stages::default_stages(),
        };

        let engine_url =
            std::env::var("ENGINE_URL").unwrap_or_else(|_| "http://127.0.0.1:8090".into());

        let stats_path: PathBuf = std::env::var("STATS_PATH")
            .unwrap_or_else(|_| "usage_stats.json".into())
            .into();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            queue_capacity,
            result_ttl: Duration::from_secs(result_ttl_secs),
            stages,
            engine_url,
            stats_path,
        }
    }
}

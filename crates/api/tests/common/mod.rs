//! Shared harness for HTTP-level integration tests.
//!
//! Mirrors the router construction in `main.rs` via
//! [`build_app_router`] so the tests exercise the same middleware stack
//! (CORS, request ID, timeout, tracing, panic recovery) that production
//! uses. The inference engine is a stub; tests pick whether a worker is
//! draining the queue.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use image::RgbImage;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use texgen_api::config::ServerConfig;
use texgen_api::router::build_app_router;
use texgen_api::state::AppState;
use texgen_core::imaging;
use texgen_engine::{EngineError, InferenceEngine};
use texgen_scheduler::{InferenceWorker, JobBoard};
use texgen_stats::StatsSink;

// ---------------------------------------------------------------------------
// Engine stub
// ---------------------------------------------------------------------------

/// Echoes the input image back after an optional delay.
pub struct EchoEngine {
    pub delay: Duration,
}

impl EchoEngine {
    pub fn instant() -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::ZERO,
        })
    }
}

#[async_trait::async_trait]
impl InferenceEngine for EchoEngine {
    async fn infer(&self, _stage: &str, input: &RgbImage) -> Result<RgbImage, EngineError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(input.clone())
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// A running test application plus the shared components tests poke at
/// directly.
pub struct TestApp {
    pub router: Router,
    pub board: Arc<JobBoard>,
    pub stats: Arc<StatsSink>,
    _dir: tempfile::TempDir,
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        queue_capacity: 50,
        result_ttl: Duration::from_secs(120),
        stages: texgen_core::stages::default_stages(),
        engine_url: "http://127.0.0.1:8090".to_string(),
        stats_path: "usage_stats.json".into(),
    }
}

/// Build the full application and spawn the worker loop.
///
/// The worker's cancellation token is dropped here; the task dies with
/// the test runtime.
pub async fn build_test_app(engine: Arc<dyn InferenceEngine>, config: ServerConfig) -> TestApp {
    let app = build_parts(config.clone()).await;

    let worker = InferenceWorker::new(
        Arc::clone(&app.board),
        engine,
        Arc::clone(&app.stats),
        config.stages,
    );
    tokio::spawn(worker.run(CancellationToken::new()));

    app
}

/// Build the application with NO worker draining the queue, so admission
/// and cancellation tests see deterministic queue contents.
pub async fn build_idle_app(config: ServerConfig) -> TestApp {
    build_parts(config).await
}

async fn build_parts(config: ServerConfig) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let stats = Arc::new(
        StatsSink::load(dir.path().join("stats.json"))
            .await
            .unwrap(),
    );
    let board = JobBoard::new(config.queue_capacity, config.result_ttl);

    let state = AppState {
        board: Arc::clone(&board),
        stats: Arc::clone(&stats),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        board,
        stats,
        _dir: dir,
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// A small valid PNG body for submissions.
pub fn png_bytes() -> Vec<u8> {
    imaging::encode_png(&RgbImage::new(8, 8)).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_bytes(app: Router, uri: &str, bytes: Vec<u8>) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::from(bytes))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

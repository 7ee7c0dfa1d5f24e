use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use texgen_api::config::ServerConfig;
use texgen_api::router::build_app_router;
use texgen_api::state::AppState;
use texgen_engine::HttpEngine;
use texgen_scheduler::{InferenceWorker, JobBoard};
use texgen_stats::StatsSink;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "texgen_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        stages = ?config.stages,
        "Loaded server configuration",
    );

    // --- Statistics sink ---
    let stats = Arc::new(
        StatsSink::load(config.stats_path.clone())
            .await
            .expect("Failed to load statistics file"),
    );
    tracing::info!(path = %config.stats_path.display(), "Statistics sink ready");

    // --- Job board ---
    let board = JobBoard::new(config.queue_capacity, config.result_ttl);
    tracing::info!(
        capacity = config.queue_capacity,
        result_ttl_secs = config.result_ttl.as_secs(),
        "Job board created",
    );

    // --- Inference worker ---
    let engine = Arc::new(HttpEngine::new(config.engine_url.clone()));
    let worker_cancel = CancellationToken::new();
    let worker = InferenceWorker::new(
        Arc::clone(&board),
        engine,
        Arc::clone(&stats),
        config.stages.clone(),
    );
    let worker_handle = tokio::spawn(worker.run(worker_cancel.clone()));

    // --- App state / router ---
    let state = AppState {
        board,
        stats,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // An in-flight stage runs to completion before the worker notices
    // the token; give it a moment.
    worker_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), worker_handle).await;
    tracing::info!("Inference worker stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

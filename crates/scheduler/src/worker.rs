//! Single background inference worker.
//!
//! One long-lived task drains the admission queue and runs every
//! configured stage against the engine, in order, for one job at a time.
//! Inference is serialized by construction -- the engine holds loaded
//! models and is not assumed safe for concurrent calls.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use texgen_core::imaging;
use texgen_engine::InferenceEngine;
use texgen_stats::StatsSink;

use crate::board::{JobBoard, QueuedJob};

/// The background worker loop.
///
/// Constructed once at startup and consumed by [`run`](Self::run) on a
/// spawned task.
pub struct InferenceWorker {
    board: Arc<JobBoard>,
    engine: Arc<dyn InferenceEngine>,
    stats: Arc<StatsSink>,
    /// Stage names in execution order.
    stages: Vec<String>,
}

impl InferenceWorker {
    pub fn new(
        board: Arc<JobBoard>,
        engine: Arc<dyn InferenceEngine>,
        stats: Arc<StatsSink>,
        stages: Vec<String>,
    ) -> Self {
        Self {
            board,
            engine,
            stats,
            stages,
        }
    }

    /// Run the worker loop until the cancellation token is triggered.
    ///
    /// Shutdown is cooperative: a job whose stage is in flight runs that
    /// stage to completion before the loop notices the token.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(stages = ?self.stages, "Inference worker started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Inference worker shutting down");
                    break;
                }
                job = self.board.next_job() => {
                    self.process(job).await;
                }
            }
        }
    }

    /// Run all stages for one job, publishing progress incrementally.
    ///
    /// The board lock is never held across an engine call; cancellation
    /// is detected at stage boundaries by the board refusing the write.
    async fn process(&self, job: QueuedJob) {
        let QueuedJob { id, image } = job;
        let total = self.stages.len();
        tracing::info!(job_id = %id, total_stages = total, "Job picked up");

        for (i, stage) in self.stages.iter().enumerate() {
            let output = match self.engine.infer(stage, &image).await {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(job_id = %id, stage = %stage, error = %e, "Stage failed");
                    self.board.fail(id, e.to_string()).await;
                    return;
                }
            };

            let artifact = match imaging::encode_png(&output) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(job_id = %id, stage = %stage, error = %e, "Artifact encoding failed");
                    self.board.fail(id, e.to_string()).await;
                    return;
                }
            };

            let progress = ((i + 1) * 100 / total) as u8;
            if !self.board.record_stage(id, stage, artifact, progress).await {
                tracing::debug!(job_id = %id, stage = %stage, "Job cancelled mid-flight, dropping results");
                return;
            }
            tracing::debug!(job_id = %id, stage = %stage, progress, "Stage complete");
        }

        let completed_at = Utc::now();
        if self.board.complete(id, completed_at).await {
            if let Err(e) = self.stats.record_completion(completed_at).await {
                tracing::error!(error = %e, "Failed to persist usage statistics");
            }
        } else {
            tracing::debug!(job_id = %id, "Job cancelled before completion write, dropping results");
        }
    }
}

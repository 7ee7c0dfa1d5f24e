//! Usage statistics sink.
//!
//! One record per process: a running total of completed jobs, the
//! timestamp of the most recent completion, and a per-UTC-day histogram.
//! The record is durable -- loaded (or initialized) at process start and
//! rewritten after every completion as an atomic whole-file replace
//! (serialize to a sibling `.tmp` file, then rename over the target), so
//! a crash mid-write never leaves a truncated file behind.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use texgen_core::types::Timestamp;

/// Errors from loading or persisting the statistics file.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// Reading or writing the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file exists but is not valid JSON for [`UsageStats`].
    #[error("Malformed statistics file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The persisted usage record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    /// Total number of jobs processed since the record was created.
    pub total_processed: u64,

    /// Timestamp of the most recent completion, if any.
    pub last_processed_at: Option<Timestamp>,

    /// Completions per UTC day, keyed by date.
    pub per_day: BTreeMap<NaiveDate, u64>,
}

/// Durable statistics sink shared by the worker and the API.
///
/// Mutation is serialized through an internal mutex; [`snapshot`]
/// clones the current record for read-only callers.
///
/// [`snapshot`]: StatsSink::snapshot
pub struct StatsSink {
    path: PathBuf,
    stats: Mutex<UsageStats>,
}

impl StatsSink {
    /// Load the record from `path`, or start fresh if the file does not
    /// exist yet.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StatsError> {
        let path = path.into();
        let stats = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No statistics file yet, starting fresh");
                UsageStats::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            stats: Mutex::new(stats),
        })
    }

    /// Record one completed job and persist the updated file.
    pub async fn record_completion(&self, at: Timestamp) -> Result<(), StatsError> {
        let mut stats = self.stats.lock().await;
        stats.total_processed += 1;
        stats.last_processed_at = Some(at);
        *stats.per_day.entry(at.date_naive()).or_insert(0) += 1;

        self.persist(&stats).await?;

        tracing::debug!(
            total_processed = stats.total_processed,
            "Usage statistics updated",
        );
        Ok(())
    }

    /// Clone of the current record.
    pub async fn snapshot(&self) -> UsageStats {
        self.stats.lock().await.clone()
    }

    /// Whole-file replace: write `<path>.tmp`, then rename over the
    /// target so readers never observe a partial file.
    async fn persist(&self, stats: &UsageStats) -> Result<(), StatsError> {
        let bytes = serde_json::to_vec_pretty(stats)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Shared job board: bounded admission queue + job-state registry.
//!
//! All mutation of queue contents and job entries happens under one
//! [`tokio::sync::Mutex`]; critical sections are kept minimal and the
//! lock is never held across an engine call. Status reads take the same
//! lock so every answer is consistent with concurrent worker updates.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use image::RgbImage;
use tokio::sync::{Mutex, Notify};
use tokio::task::AbortHandle;

use texgen_core::error::CoreError;
use texgen_core::types::{JobId, Timestamp};

use crate::eviction;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default maximum number of pending (not yet picked up) jobs.
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// Default residency of a finished job's results before eviction.
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A job waiting in the admission queue.
///
/// Owns the decoded input image until the worker takes it.
pub struct QueuedJob {
    pub id: JobId,
    pub image: RgbImage,
}

/// Point-in-time answer to a status query.
#[derive(Debug)]
pub enum JobStatus {
    /// Still in the admission queue, at this 0-based position.
    Waiting { position: usize },

    /// Being worked on.
    Processing { progress: u8 },

    /// All stages done. Returned exactly once; the entry is gone after
    /// this answer.
    Completed { result: BTreeMap<String, Vec<u8>> },

    /// A stage failed. Artifacts produced before the failure stay
    /// readable until eviction or cancellation.
    Failed {
        progress: u8,
        error: String,
        partial: BTreeMap<String, Vec<u8>>,
    },

    /// Unknown, consumed, evicted, or cancelled -- indistinguishable by
    /// design.
    NotFound,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

enum JobState {
    Queued,
    Processing,
    Completed,
    Failed(String),
}

struct JobEntry {
    state: JobState,
    progress: u8,
    /// Stage name -> PNG-encoded artifact. Additive; never overwritten.
    artifacts: BTreeMap<String, Vec<u8>>,
    created_at: Timestamp,
    completed_at: Option<Timestamp>,
    /// Pending eviction timer, armed once the job reaches a terminal
    /// state. Aborted when the entry is consumed or cancelled.
    eviction: Option<AbortHandle>,
}

struct BoardInner {
    queue: VecDeque<QueuedJob>,
    jobs: HashMap<JobId, JobEntry>,
}

// ---------------------------------------------------------------------------
// JobBoard
// ---------------------------------------------------------------------------

/// The authoritative store for job lifecycle, progress, and results.
///
/// Created once at startup via [`JobBoard::new`]; the `Arc` is cloned
/// into request handlers and the worker.
pub struct JobBoard {
    capacity: usize,
    result_ttl: Duration,
    inner: Mutex<BoardInner>,
    /// Wakes the worker when a job is admitted.
    notify: Notify,
}

impl JobBoard {
    /// Create a board with the given admission capacity and result
    /// residency timeout.
    pub fn new(capacity: usize, result_ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            result_ttl,
            inner: Mutex::new(BoardInner {
                queue: VecDeque::new(),
                jobs: HashMap::new(),
            }),
            notify: Notify::new(),
        })
    }

    // -- admission path -----------------------------------------------------

    /// Admit a decoded image as a new job.
    ///
    /// The registry entry is created before the FIFO push, inside the
    /// same critical section, so a status query can never answer "not
    /// found" for a job that was successfully admitted. When the queue
    /// is at capacity the submission is rejected without touching the
    /// registry.
    pub async fn submit(&self, image: RgbImage) -> Result<JobId, CoreError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        if inner.queue.len() >= self.capacity {
            return Err(CoreError::QueueFull {
                capacity: self.capacity,
            });
        }

        let id = JobId::new_v4();
        inner.jobs.insert(
            id,
            JobEntry {
                state: JobState::Queued,
                progress: 0,
                artifacts: BTreeMap::new(),
                created_at: Utc::now(),
                completed_at: None,
                eviction: None,
            },
        );
        inner.queue.push_back(QueuedJob { id, image });
        drop(guard);

        self.notify.notify_one();
        Ok(id)
    }

    /// Answer a status query for `id`.
    ///
    /// Reading a `Completed` job consumes it: the whole entry (progress
    /// bookkeeping included) is removed after being returned once, and
    /// its eviction timer is disarmed. The next query for the same id
    /// answers `NotFound`.
    pub async fn status(&self, id: JobId) -> JobStatus {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let Some(entry) = inner.jobs.get(&id) else {
            return JobStatus::NotFound;
        };

        match &entry.state {
            JobState::Queued => {
                // A queued entry is by invariant still in the FIFO.
                let position = inner
                    .queue
                    .iter()
                    .position(|j| j.id == id)
                    .unwrap_or_default();
                JobStatus::Waiting { position }
            }
            JobState::Processing => JobStatus::Processing {
                progress: entry.progress,
            },
            JobState::Failed(error) => JobStatus::Failed {
                progress: entry.progress,
                error: error.clone(),
                partial: entry.artifacts.clone(),
            },
            JobState::Completed => {
                let Some(entry) = inner.jobs.remove(&id) else {
                    return JobStatus::NotFound;
                };
                if let Some(handle) = entry.eviction {
                    handle.abort();
                }
                tracing::debug!(job_id = %id, "Completed result consumed");
                JobStatus::Completed {
                    result: entry.artifacts,
                }
            }
        }
    }

    /// Remove a job's bookkeeping wherever it lives. Idempotent.
    ///
    /// A still-queued job is also removed from the FIFO, preserving the
    /// relative order of the remaining entries. An in-flight job keeps
    /// running; the worker drops its writes at the next stage boundary.
    pub async fn cancel(&self, id: JobId) -> bool {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let removed = match inner.jobs.remove(&id) {
            Some(entry) => {
                if let Some(handle) = entry.eviction {
                    handle.abort();
                }
                true
            }
            None => false,
        };
        inner.queue.retain(|j| j.id != id);
        removed
    }

    /// Number of jobs waiting in the admission queue.
    pub async fn queue_depth(&self) -> usize {
        self.inner.lock().await.queue.len()
    }

    // -- worker path --------------------------------------------------------

    /// Wait for the next admitted job and take ownership of it.
    ///
    /// Marks the job `Processing` in the same critical section as the
    /// FIFO pop, so no status query can observe the gap between the two.
    pub async fn next_job(&self) -> QueuedJob {
        loop {
            let notified = self.notify.notified();
            if let Some(job) = self.try_take().await {
                return job;
            }
            notified.await;
        }
    }

    async fn try_take(&self) -> Option<QueuedJob> {
        let mut inner = self.inner.lock().await;
        while let Some(job) = inner.queue.pop_front() {
            match inner.jobs.get_mut(&job.id) {
                Some(entry) => {
                    entry.state = JobState::Processing;
                    return Some(job);
                }
                None => {
                    // Cancelled after admission; never run it.
                    tracing::debug!(job_id = %job.id, "Skipping job cancelled while queued");
                }
            }
        }
        None
    }

    /// Merge one stage's artifact and advance progress.
    ///
    /// Returns `false` if the job is no longer tracked (cancelled); the
    /// caller drops the remaining work.
    pub async fn record_stage(
        &self,
        id: JobId,
        stage: &str,
        artifact: Vec<u8>,
        progress: u8,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.jobs.get_mut(&id) {
            Some(entry) => {
                entry.artifacts.insert(stage.to_string(), artifact);
                entry.progress = progress;
                true
            }
            None => false,
        }
    }

    /// Mark a job completed and arm its eviction timer.
    ///
    /// Returns `false` if the job was cancelled mid-flight, in which
    /// case nothing is written and the results are discarded.
    pub async fn complete(self: &Arc<Self>, id: JobId, completed_at: Timestamp) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(entry) = inner.jobs.get_mut(&id) else {
            return false;
        };

        entry.state = JobState::Completed;
        entry.progress = 100;
        entry.completed_at = Some(completed_at);
        entry.eviction = Some(eviction::schedule(Arc::clone(self), id, self.result_ttl));

        let elapsed_ms = (completed_at - entry.created_at).num_milliseconds();
        tracing::info!(job_id = %id, elapsed_ms, "Job completed");
        true
    }

    /// Mark a job failed after a stage error.
    ///
    /// Artifacts written so far stay readable; the eviction timer runs
    /// on the same clock as for completed jobs so abandoned failures
    /// cannot accumulate. Returns `false` if the job was cancelled.
    pub async fn fail(self: &Arc<Self>, id: JobId, error: String) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(entry) = inner.jobs.get_mut(&id) else {
            return false;
        };

        tracing::warn!(job_id = %id, error = %error, "Job failed");
        entry.state = JobState::Failed(error);
        entry.completed_at = Some(Utc::now());
        entry.eviction = Some(eviction::schedule(Arc::clone(self), id, self.result_ttl));
        true
    }

    /// Remove a finished job that was never collected.
    ///
    /// No-op if the id is already gone (consumed or cancelled first).
    pub(crate) async fn evict(&self, id: JobId) {
        let mut inner = self.inner.lock().await;
        if let Some(entry) = inner.jobs.remove(&id) {
            if let Some(done_at) = entry.completed_at {
                let resident_secs = (Utc::now() - done_at).num_seconds();
                tracing::info!(job_id = %id, resident_secs, "Evicted uncollected result");
            } else {
                tracing::info!(job_id = %id, "Evicted uncollected result");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn test_image() -> RgbImage {
        RgbImage::new(4, 4)
    }

    fn board(capacity: usize) -> Arc<JobBoard> {
        JobBoard::new(capacity, Duration::from_secs(120))
    }

    /// Drive a job through the worker-facing API as if every stage
    /// succeeded.
    async fn run_to_completion(board: &Arc<JobBoard>, stages: &[&str]) -> JobId {
        let job = board.next_job().await;
        let total = stages.len();
        for (i, stage) in stages.iter().enumerate() {
            let progress = ((i + 1) * 100 / total) as u8;
            assert!(board.record_stage(job.id, stage, vec![i as u8], progress).await);
        }
        assert!(board.complete(job.id, Utc::now()).await);
        job.id
    }

    // -- admission ----------------------------------------------------------

    #[tokio::test]
    async fn admitted_job_is_immediately_visible() {
        let board = board(8);
        let id = board.submit(test_image()).await.unwrap();

        assert_matches!(board.status(id).await, JobStatus::Waiting { position: 0 });
    }

    #[tokio::test]
    async fn queue_positions_follow_submission_order() {
        let board = board(8);
        let a = board.submit(test_image()).await.unwrap();
        let b = board.submit(test_image()).await.unwrap();
        let c = board.submit(test_image()).await.unwrap();

        assert_matches!(board.status(a).await, JobStatus::Waiting { position: 0 });
        assert_matches!(board.status(b).await, JobStatus::Waiting { position: 1 });
        assert_matches!(board.status(c).await, JobStatus::Waiting { position: 2 });
    }

    #[tokio::test]
    async fn overflow_is_rejected_without_touching_the_registry() {
        let board = board(2);
        let a = board.submit(test_image()).await.unwrap();
        let b = board.submit(test_image()).await.unwrap();

        let err = board.submit(test_image()).await.unwrap_err();
        assert_matches!(err, CoreError::QueueFull { capacity: 2 });

        // The admitted jobs are unaffected.
        assert_matches!(board.status(a).await, JobStatus::Waiting { position: 0 });
        assert_matches!(board.status(b).await, JobStatus::Waiting { position: 1 });

        // Freeing a slot lets a later submission in.
        assert!(board.cancel(a).await);
        board.submit(test_image()).await.unwrap();
    }

    // -- cancellation -------------------------------------------------------

    #[tokio::test]
    async fn cancelling_a_queued_job_removes_it_and_preserves_order() {
        let board = board(8);
        let a = board.submit(test_image()).await.unwrap();
        let b = board.submit(test_image()).await.unwrap();
        let c = board.submit(test_image()).await.unwrap();

        assert!(board.cancel(b).await);

        assert_matches!(board.status(b).await, JobStatus::NotFound);
        assert_matches!(board.status(a).await, JobStatus::Waiting { position: 0 });
        assert_matches!(board.status(c).await, JobStatus::Waiting { position: 1 });
        assert_eq!(board.queue_depth().await, 2);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let board = board(8);
        let a = board.submit(test_image()).await.unwrap();

        assert!(board.cancel(a).await);
        assert!(!board.cancel(a).await);
        assert!(!board.cancel(JobId::new_v4()).await);
    }

    #[tokio::test]
    async fn cancelling_an_in_flight_job_drops_its_writes() {
        let board = board(8);
        let id = board.submit(test_image()).await.unwrap();

        let job = board.next_job().await;
        assert_eq!(job.id, id);
        assert_matches!(board.status(id).await, JobStatus::Processing { progress: 0 });

        assert!(board.cancel(id).await);

        // The worker's subsequent writes land nowhere.
        assert!(!board.record_stage(id, "Albedo", vec![1], 20).await);
        assert!(!board.complete(id, Utc::now()).await);
        assert_matches!(board.status(id).await, JobStatus::NotFound);
    }

    #[tokio::test]
    async fn cancelling_a_completed_job_removes_the_result() {
        let board = board(8);
        let _ = board.submit(test_image()).await.unwrap();
        let id = run_to_completion(&board, &["Albedo", "Normal"]).await;

        assert!(board.cancel(id).await);
        assert_matches!(board.status(id).await, JobStatus::NotFound);
    }

    // -- worker path --------------------------------------------------------

    #[tokio::test]
    async fn next_job_wakes_on_submission() {
        let board = board(8);

        let waiter = {
            let board = Arc::clone(&board);
            tokio::spawn(async move { board.next_job().await.id })
        };

        // Give the waiter a chance to park before submitting.
        tokio::task::yield_now().await;
        let id = board.submit(test_image()).await.unwrap();

        assert_eq!(waiter.await.unwrap(), id);
    }

    #[tokio::test]
    async fn progress_and_artifacts_accumulate_per_stage() {
        let board = board(8);
        let id = board.submit(test_image()).await.unwrap();

        let job = board.next_job().await;
        assert!(board.record_stage(job.id, "Albedo", vec![1], 50).await);
        assert_matches!(board.status(id).await, JobStatus::Processing { progress: 50 });

        assert!(board.record_stage(job.id, "Normal", vec![2], 100).await);
        assert!(board.complete(job.id, Utc::now()).await);

        match board.status(id).await {
            JobStatus::Completed { result } => {
                assert_eq!(result.len(), 2);
                assert_eq!(result["Albedo"], vec![1]);
                assert_eq!(result["Normal"], vec![2]);
            }
            other => panic!("expected completed, got {other:?}"),
        }
    }

    // -- consuming read -----------------------------------------------------

    #[tokio::test]
    async fn completed_result_is_delivered_at_most_once() {
        let board = board(8);
        let _ = board.submit(test_image()).await.unwrap();
        let id = run_to_completion(&board, &["Albedo"]).await;

        assert_matches!(board.status(id).await, JobStatus::Completed { .. });
        assert_matches!(board.status(id).await, JobStatus::NotFound);
    }

    // -- failure ------------------------------------------------------------

    #[tokio::test]
    async fn failed_job_keeps_partial_results_across_reads() {
        let board = board(8);
        let id = board.submit(test_image()).await.unwrap();

        let job = board.next_job().await;
        assert!(board.record_stage(job.id, "Albedo", vec![1], 20).await);
        assert!(board.fail(job.id, "engine exploded".to_string()).await);

        for _ in 0..2 {
            match board.status(id).await {
                JobStatus::Failed {
                    progress,
                    error,
                    partial,
                } => {
                    assert_eq!(progress, 20);
                    assert_eq!(error, "engine exploded");
                    assert_eq!(partial.len(), 1);
                }
                other => panic!("expected failed, got {other:?}"),
            }
        }
    }

    // -- eviction -----------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn uncollected_result_is_evicted_after_the_ttl() {
        let ttl = Duration::from_secs(120);
        let board = JobBoard::new(8, ttl);
        let _ = board.submit(test_image()).await.unwrap();
        let id = run_to_completion(&board, &["Albedo"]).await;

        tokio::time::sleep(ttl + Duration::from_secs(1)).await;

        assert_matches!(board.status(id).await, JobStatus::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn result_is_still_collectable_just_before_the_ttl() {
        let ttl = Duration::from_secs(120);
        let board = JobBoard::new(8, ttl);
        let _ = board.submit(test_image()).await.unwrap();
        let id = run_to_completion(&board, &["Albedo"]).await;

        tokio::time::sleep(ttl - Duration::from_secs(1)).await;

        assert_matches!(board.status(id).await, JobStatus::Completed { .. });
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_is_evicted_after_the_ttl() {
        let ttl = Duration::from_secs(120);
        let board = JobBoard::new(8, ttl);
        let id = board.submit(test_image()).await.unwrap();

        let job = board.next_job().await;
        assert!(board.fail(job.id, "boom".to_string()).await);

        tokio::time::sleep(ttl + Duration::from_secs(1)).await;

        assert_matches!(board.status(id).await, JobStatus::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_evictions_do_not_interfere() {
        let ttl = Duration::from_secs(120);
        let board = JobBoard::new(8, ttl);

        let _ = board.submit(test_image()).await.unwrap();
        let first = run_to_completion(&board, &["Albedo"]).await;

        tokio::time::sleep(Duration::from_secs(60)).await;

        let _ = board.submit(test_image()).await.unwrap();
        let second = run_to_completion(&board, &["Albedo"]).await;

        // First timer fires at t=120, second at t=180.
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_matches!(board.status(first).await, JobStatus::NotFound);
        assert_matches!(board.status(second).await, JobStatus::Completed { .. });
    }
}

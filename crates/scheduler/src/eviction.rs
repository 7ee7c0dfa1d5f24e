//! Deferred eviction of stale results.
//!
//! Each finished job gets an independent timer task; when it fires, the
//! job is removed from the board unless a status read already consumed
//! it. Removal is idempotent, so timers racing against cancellation or a
//! consuming read need no coordination beyond the board lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;

use texgen_core::types::JobId;

use crate::board::JobBoard;

/// Spawn the eviction timer for `id`.
///
/// The returned handle is stored in the job's registry entry and aborted
/// if the entry is consumed or cancelled first, so timers never outlive
/// the job they guard.
pub(crate) fn schedule(board: Arc<JobBoard>, id: JobId, ttl: Duration) -> AbortHandle {
    let task = tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        board.evict(id).await;
    });
    task.abort_handle()
}

//! Job queue and inference scheduling.
//!
//! The concurrency core of the service: a bounded admission queue and
//! job-state registry behind a single lock ([`JobBoard`]), one
//! long-lived background worker ([`InferenceWorker`]) that drains the
//! queue and drives the engine stage by stage, and per-job eviction
//! timers that purge results nobody collects.

pub mod board;
mod eviction;
pub mod worker;

pub use board::{JobBoard, JobStatus, QueuedJob};
pub use worker::InferenceWorker;

use crate::types::JobId;

/// Domain-level error type shared across texgen crates.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The admission queue is at its configured capacity.
    /// Retryable by the caller after backoff.
    #[error("Admission queue full ({capacity} pending jobs)")]
    QueueFull { capacity: usize },

    /// The submitted bytes could not be decoded as an image.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// No tracked job with this identifier. Consumed and evicted jobs
    /// answer the same way as never-submitted ones.
    #[error("Job {0} not found")]
    JobNotFound(JobId),

    /// Startup configuration failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Internal error with a human-readable message.
    #[error("Internal error: {0}")]
    Internal(String),
}

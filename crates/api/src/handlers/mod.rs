//! Request handlers.
//!
//! Handlers stay thin: decode the request, call into the job board or
//! the statistics sink, and map errors via [`AppError`].
//!
//! [`AppError`]: crate::error::AppError

pub mod jobs;
pub mod stats;

//! Inference engine boundary.
//!
//! The worker drives an [`InferenceEngine`] implementation once per
//! configured stage: same input image in, one transformed output map
//! back. The production implementation ([`HttpEngine`]) talks to a
//! model-serving process over HTTP; tests substitute their own.
//!
//! The engine is assumed resource-heavy and not safe for concurrent
//! calls -- callers serialize access (one worker, one call at a time).

mod http;

pub use http::HttpEngine;

use image::RgbImage;

/// Errors from an inference engine call.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The model server returned a non-2xx status code.
    #[error("Engine error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The input image could not be serialized for transport.
    #[error("Failed to encode input image: {0}")]
    BadInput(String),

    /// The model server answered 2xx but the payload was not a usable image.
    #[error("Engine returned an undecodable image: {0}")]
    BadOutput(String),
}

/// A named-stage image-to-image inference backend.
#[async_trait::async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Run the model for `stage` against `input` and return the
    /// transformed image.
    async fn infer(&self, stage: &str, input: &RgbImage) -> Result<RgbImage, EngineError>;
}

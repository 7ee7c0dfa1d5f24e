//! Handlers for job submission, status polling, and cancellation.
//!
//! Submission takes the raw image bytes as the request body. Results are
//! delivered once, base64-encoded, by the first status poll that
//! observes completion; afterwards the job answers "not found".

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use serde_json::json;

use texgen_core::imaging;
use texgen_core::types::JobId;
use texgen_scheduler::JobStatus;

use crate::error::AppResult;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Response for POST /submit.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
}

/// Status payload for a tracked job.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatusResponse {
    Waiting {
        queue_position: usize,
    },
    Processing {
        progress: u8,
    },
    Completed {
        progress: u8,
        /// Stage name -> base64-encoded PNG artifact.
        result: BTreeMap<String, String>,
    },
    Failed {
        progress: u8,
        error: String,
        /// Artifacts of the stages that finished before the failure.
        result: BTreeMap<String, String>,
    },
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/submit
///
/// Admit a new job. Returns 202 with the job id, 400 if the body is not
/// a decodable image, or 503 when the admission queue is full.
pub async fn submit_job(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let image = imaging::decode_rgb(&body)?;
    let job_id = state.board.submit(image).await?;

    tracing::info!(job_id = %job_id, body_bytes = body.len(), "Job submitted");

    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { job_id })))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/status/{id}
///
/// Poll a job. Reading a completed job consumes its result; the next
/// poll answers 404. An unparseable id answers the same as an unknown
/// one -- "not found" is a valid terminal answer, not an error.
pub async fn job_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<JobId>() else {
        return not_found();
    };

    match state.board.status(id).await {
        JobStatus::NotFound => not_found(),
        JobStatus::Waiting { position } => Json(StatusResponse::Waiting {
            queue_position: position,
        })
        .into_response(),
        JobStatus::Processing { progress } => {
            Json(StatusResponse::Processing { progress }).into_response()
        }
        JobStatus::Completed { result } => Json(StatusResponse::Completed {
            progress: 100,
            result: encode_artifacts(result),
        })
        .into_response(),
        JobStatus::Failed {
            progress,
            error,
            partial,
        } => Json(StatusResponse::Failed {
            progress,
            error,
            result: encode_artifacts(partial),
        })
        .into_response(),
    }
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// POST /api/v1/cancel/{id}
///
/// Drop a job's bookkeeping. Answers 200 regardless of prior state;
/// cancelling an unknown or finished job is a no-op.
pub async fn cancel_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if let Ok(id) = id.parse::<JobId>() {
        let removed = state.board.cancel(id).await;
        tracing::info!(job_id = %id, removed, "Job cancel requested");
    }

    Json(json!({ "status": "cancelled" })).into_response()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": "not found" })),
    )
        .into_response()
}

/// Base64-encode each stage artifact for JSON transport.
fn encode_artifacts(artifacts: BTreeMap<String, Vec<u8>>) -> BTreeMap<String, String> {
    artifacts
        .into_iter()
        .map(|(stage, bytes)| (stage, STANDARD.encode(bytes)))
        .collect()
}

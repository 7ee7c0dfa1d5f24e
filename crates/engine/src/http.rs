//! HTTP client for the model-serving backend.
//!
//! One request per stage: the input is PNG-encoded, base64'd into a JSON
//! body, and POSTed to `{base_url}/infer/{stage}`. The response carries
//! the output map the same way.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use texgen_core::imaging;

use crate::{EngineError, InferenceEngine};

/// HTTP client for a single model-serving instance.
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: String,
}

/// Request body for `POST /infer/{stage}`.
#[derive(Debug, Serialize)]
struct InferRequest<'a> {
    /// Base64-encoded PNG of the source image.
    image: &'a str,
}

/// Response body from `POST /infer/{stage}`.
#[derive(Debug, Deserialize)]
struct InferResponse {
    /// Base64-encoded PNG of the generated map.
    image: String,
}

impl HttpEngine {
    /// Create a new client for a model server.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `http://host:8090`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Check the response status and deserialize the JSON payload.
    async fn parse_response(response: reqwest::Response) -> Result<InferResponse, EngineError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl InferenceEngine for HttpEngine {
    async fn infer(&self, stage: &str, input: &RgbImage) -> Result<RgbImage, EngineError> {
        let png = imaging::encode_png(input).map_err(|e| EngineError::BadInput(e.to_string()))?;
        let encoded = STANDARD.encode(&png);

        let response = self
            .client
            .post(format!("{}/infer/{stage}", self.base_url))
            .json(&InferRequest { image: &encoded })
            .send()
            .await?;

        let payload = Self::parse_response(response).await?;

        let bytes = STANDARD
            .decode(payload.image.as_bytes())
            .map_err(|e| EngineError::BadOutput(format!("invalid base64: {e}")))?;

        let output =
            imaging::decode_rgb(&bytes).map_err(|e| EngineError::BadOutput(e.to_string()))?;

        tracing::debug!(
            stage,
            width = output.width(),
            height = output.height(),
            "Inference call completed",
        );

        Ok(output)
    }
}

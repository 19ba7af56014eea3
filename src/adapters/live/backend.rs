//! Live adapter for the `GenerationBackend` port over HTTP.

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};

use crate::error::BackendError;
use crate::ports::backend::{
    CostEstimate, CostFuture, CostRequest, GenerationBackend, GenerationRequest, StreamFuture,
};

/// Live backend client that calls `{base_url}/generate/...`.
pub struct LiveGenerationBackend {
    client: Client,
    base_url: String,
}

impl LiveGenerationBackend {
    /// Creates a client for the backend at `base_url` (no trailing slash needed).
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self { client: Client::new(), base_url: base_url.trim_end_matches('/').to_string() }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/generate/{path}", self.base_url)
    }
}

/// Maps a non-success status onto the port's error vocabulary.
fn status_error(status: StatusCode) -> BackendError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        BackendError::RateLimited
    } else {
        BackendError::Status(status.as_u16())
    }
}

impl GenerationBackend for LiveGenerationBackend {
    fn estimate_cost(&self, request: &CostRequest) -> CostFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let response = self
                .client
                .post(self.endpoint("cost"))
                .json(&request)
                .send()
                .await
                .map_err(|e| BackendError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(status_error(status));
            }

            response.json::<CostEstimate>().await.map_err(|e| BackendError::Decode(e.to_string()))
        })
    }

    fn stream(&self, request: &GenerationRequest) -> StreamFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let response = self
                .client
                .post(self.endpoint("stream"))
                .json(&request)
                .send()
                .await
                .map_err(|e| BackendError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(status_error(status));
            }

            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| BackendError::Transport(e.to_string())));
            Ok(Box::pin(body) as crate::ports::ByteStream)
        })
    }
}

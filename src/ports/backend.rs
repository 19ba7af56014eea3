//! Generation backend port: cost estimation and the streaming generation endpoint.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Raw body of a streaming generation response, chunked as it arrives.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BackendError>> + Send>>;

/// Boxed future returned by [`GenerationBackend::stream`].
pub type StreamFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ByteStream, BackendError>> + Send + 'a>>;

/// Boxed future returned by [`GenerationBackend::estimate_cost`].
pub type CostFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CostEstimate, BackendError>> + Send + 'a>>;

/// Body of `POST /generate/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Repository owner.
    pub username: String,
    /// Repository name.
    pub repo: String,
    /// Free-form modification instructions; empty for a plain generation.
    pub instructions: String,
    /// User-supplied model API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// User-supplied GitHub token for private repositories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_pat: Option<String>,
}

/// Body of `POST /generate/cost`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRequest {
    /// Repository owner.
    pub username: String,
    /// Repository name.
    pub repo: String,
    /// Instructions the generation will run with.
    pub instructions: String,
    /// User-supplied GitHub token for private repositories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_pat: Option<String>,
}

/// Response of `POST /generate/cost`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// Human-readable cost, e.g. `"$0.02 USD"`.
    #[serde(default)]
    pub cost: Option<String>,
    /// Set when the backend refuses to generate.
    #[serde(default)]
    pub error: Option<String>,
}

/// The external diagram-generation service.
pub trait GenerationBackend: Send + Sync {
    /// Asks the backend what a generation would cost.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    fn estimate_cost(&self, request: &CostRequest) -> CostFuture<'_>;

    /// Starts a streaming generation and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::RateLimited`] on HTTP 429 and other variants
    /// for transport failures or non-success statuses.
    fn stream(&self, request: &GenerationRequest) -> StreamFuture<'_>;
}

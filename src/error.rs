//! Error types shared across ports and the diagram orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by the generation backend port.
///
/// Serializable so recorded cassettes can replay the exact failure kind
/// (a rate limit must replay as a rate limit, not as a generic string).
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum BackendError {
    /// The backend answered HTTP 429.
    #[error("rate limit exceeded")]
    RateLimited,
    /// The backend answered with another non-success status.
    #[error("backend returned HTTP {0}")]
    Status(u16),
    /// The request could not be sent or the body could not be read.
    #[error("backend transport failure: {0}")]
    Transport(String),
    /// The response body was not in the expected shape.
    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

/// Failures reported by the source-control port.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SourceControlError {
    /// The repository or branch does not exist.
    #[error("branch not found")]
    NotFound,
    /// The API rate limit was hit.
    #[error("source-control rate limit exceeded")]
    RateLimited,
    /// Any other non-success status.
    #[error("source-control API returned HTTP {0}")]
    Status(u16),
    /// Network failure.
    #[error("source-control transport failure: {0}")]
    Transport(String),
    /// The response body did not carry a commit date.
    #[error("failed to decode branch response: {0}")]
    Decode(String),
}

/// Why a generation call did not reach `complete`.
///
/// Internal to the orchestrator; [`GenerationError::user_message`] is what
/// crosses the boundary to the UI layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// HTTP 429 from the backend.
    #[error("rate limited")]
    RateLimited,
    /// Network failure, non-2xx status, or a broken body stream.
    #[error("transport failure: {0}")]
    Transport(String),
    /// No chunk arrived within the idle timeout.
    #[error("stream idle for {0}s")]
    IdleTimeout(u64),
    /// The backend sent an explicit error frame.
    #[error("backend error: {0}")]
    Backend(String),
    /// The cost endpoint refused the generation.
    #[error("cost estimation failed: {0}")]
    Cost(String),
    /// The stream closed before a terminal frame.
    #[error("stream ended before completion")]
    Truncated,
    /// The stream completed without any diagram text.
    #[error("completed without a diagram")]
    EmptyDiagram,
    /// A newer call for the same repository cancelled this one.
    #[error("superseded")]
    Superseded,
    /// A local precondition failed; never sent to the backend.
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl GenerationError {
    /// The message shown to the user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited => "Rate limit exceeded. Please try again later.".to_string(),
            Self::Transport(_) => "Failed to start streaming".to_string(),
            Self::IdleTimeout(secs) => {
                format!("Generation stalled: no progress received for {secs} seconds")
            }
            Self::Backend(msg) | Self::Cost(msg) | Self::Invalid(msg) => msg.clone(),
            Self::Truncated => "Generation stream ended before completion".to_string(),
            Self::EmptyDiagram => "Generation completed without a diagram".to_string(),
            Self::Superseded => "Generation was superseded by a newer request".to_string(),
        }
    }
}

impl From<BackendError> for GenerationError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::RateLimited => Self::RateLimited,
            other => Self::Transport(other.to_string()),
        }
    }
}

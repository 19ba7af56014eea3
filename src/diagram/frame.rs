//! Stream frames and the phase markers they carry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generation phase, in stream order.
///
/// The declaration order is the progression order; [`Phase::rank`] exposes
/// it for the state machine's forward-only rule. `Error` sits outside the
/// progression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No generation has started.
    #[default]
    Idle,
    /// The backend accepted the request.
    Started,
    /// The explanation prompt was sent to the model.
    ExplanationSent,
    /// The explanation is being produced.
    Explanation,
    /// An explanation fragment arrived.
    ExplanationChunk,
    /// The mapping prompt was sent.
    MappingSent,
    /// The component mapping is being produced.
    Mapping,
    /// A mapping fragment arrived.
    MappingChunk,
    /// The diagram prompt was sent.
    DiagramSent,
    /// The diagram is being produced.
    Diagram,
    /// A diagram fragment arrived.
    DiagramChunk,
    /// Generation finished.
    Complete,
    /// Generation failed.
    Error,
}

/// Which accumulator a chunk frame appends to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// `explanation`.
    Explanation,
    /// `mapping`.
    Mapping,
    /// `diagram`.
    Diagram,
}

impl Phase {
    /// Position in the progression; `None` for [`Phase::Error`].
    #[must_use]
    pub const fn rank(self) -> Option<u8> {
        Some(match self {
            Self::Idle => 0,
            Self::Started => 1,
            Self::ExplanationSent => 2,
            Self::Explanation => 3,
            Self::ExplanationChunk => 4,
            Self::MappingSent => 5,
            Self::Mapping => 6,
            Self::MappingChunk => 7,
            Self::DiagramSent => 8,
            Self::Diagram => 9,
            Self::DiagramChunk => 10,
            Self::Complete => 11,
            Self::Error => return None,
        })
    }

    /// The accumulator a `*_chunk` phase feeds.
    #[must_use]
    pub const fn chunk_section(self) -> Option<Section> {
        match self {
            Self::ExplanationChunk => Some(Section::Explanation),
            Self::MappingChunk => Some(Section::Mapping),
            Self::DiagramChunk => Some(Section::Diagram),
            _ => None,
        }
    }

    /// `complete` and `error` absorb every later frame.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// The wire spelling of this phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Started => "started",
            Self::ExplanationSent => "explanation_sent",
            Self::Explanation => "explanation",
            Self::ExplanationChunk => "explanation_chunk",
            Self::MappingSent => "mapping_sent",
            Self::Mapping => "mapping",
            Self::MappingChunk => "mapping_chunk",
            Self::DiagramSent => "diagram_sent",
            Self::Diagram => "diagram",
            Self::DiagramChunk => "diagram_chunk",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded `data:` line of the generation stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFrame {
    /// Phase marker. Error frames may omit it.
    #[serde(default)]
    pub status: Phase,
    /// Progress text for the UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Incremental text for a `*_chunk` frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
    /// Full explanation, on `complete`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Full mapping, on `complete`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<String>,
    /// Full diagram, on `complete`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram: Option<String>,
    /// Backend failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamFrame {
    /// A bare frame with only a status.
    #[must_use]
    pub fn new(status: Phase) -> Self {
        Self { status, ..Self::default() }
    }

    /// A `*_chunk` frame carrying `text`.
    #[must_use]
    pub fn chunk(status: Phase, text: &str) -> Self {
        Self { status, chunk: Some(text.to_string()), ..Self::default() }
    }

    /// A backend error frame.
    #[must_use]
    pub fn failure(message: &str) -> Self {
        Self { status: Phase::Error, error: Some(message.to_string()), ..Self::default() }
    }

    /// The backend error this frame carries, if any.
    ///
    /// An explicit non-empty `error` field wins regardless of `status`.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self.error.as_deref() {
            Some(msg) if !msg.is_empty() => Some(msg),
            _ if self.status == Phase::Error => Some("An unknown error occurred"),
            _ => None,
        }
    }
}

//! Generation state machine.
//!
//! One [`GenerationState`] lives for one generation call. Frames are applied
//! in arrival order:
//!
//! ```text
//! idle → started → explanation_sent → explanation → explanation_chunk*
//!      → mapping_sent → mapping → mapping_chunk*
//!      → diagram_sent → diagram → diagram_chunk* → complete
//!                                   (any) → error
//! ```
//!
//! Status only moves forward (skips allowed). Chunk frames always append to
//! their accumulator. `complete` and `error` absorb everything after them.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::frame::{Phase, Section, StreamFrame};

/// Message shown when a generation call begins.
pub const STARTING_MESSAGE: &str = "Starting generation process...";

/// Snapshot of one generation call, as exposed to progress UIs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationState {
    /// Current phase.
    pub status: Phase,
    /// Latest progress message.
    pub message: Option<String>,
    /// Accumulated or final explanation.
    pub explanation: String,
    /// Accumulated or final component mapping.
    pub mapping: String,
    /// Accumulated or final diagram.
    pub diagram: String,
    /// Failure message; only set in [`Phase::Error`].
    pub error: Option<String>,
}

/// What applying one frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Status or an accumulator changed.
    Advanced,
    /// The frame was ignored (terminal state, or a backward status).
    Ignored,
    /// The frame moved the machine into `complete` or `error`.
    Terminated,
}

impl GenerationState {
    /// The state every generation call starts from.
    #[must_use]
    pub fn started() -> Self {
        Self {
            status: Phase::Started,
            message: Some(STARTING_MESSAGE.to_string()),
            ..Self::default()
        }
    }

    /// Whether no further frames will be applied.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Applies one frame.
    pub fn apply(&mut self, frame: StreamFrame) -> Transition {
        if self.is_terminal() {
            return Transition::Ignored;
        }

        if let Some(message) = frame.error_message() {
            self.fail(message);
            return Transition::Terminated;
        }

        if frame.status == Phase::Complete {
            self.complete(frame);
            return Transition::Terminated;
        }

        let appended = match (frame.status.chunk_section(), frame.chunk.as_deref()) {
            (Some(section), Some(text)) if !text.is_empty() => {
                self.accumulator(section).push_str(text);
                true
            }
            _ => false,
        };

        if self.status.rank() <= frame.status.rank() {
            self.status = frame.status;
            if frame.message.is_some() {
                self.message = frame.message;
            }
            Transition::Advanced
        } else if appended {
            Transition::Advanced
        } else {
            debug!(from = %self.status, to = %frame.status, "ignoring backward phase transition");
            Transition::Ignored
        }
    }

    /// Moves to `error`, keeping every accumulator as it is.
    ///
    /// Used for backend error frames and for failures outside the stream
    /// (transport errors, timeouts). No-op once terminal.
    pub fn fail(&mut self, message: &str) {
        if self.is_terminal() {
            return;
        }
        self.status = Phase::Error;
        self.error = Some(message.to_string());
    }

    fn complete(&mut self, frame: StreamFrame) {
        fn prefer(full: Option<String>, accumulated: &mut String) {
            if let Some(text) = full.filter(|t| !t.is_empty()) {
                *accumulated = text;
            }
        }

        self.status = Phase::Complete;
        if frame.message.is_some() {
            self.message = frame.message;
        }
        prefer(frame.explanation, &mut self.explanation);
        prefer(frame.mapping, &mut self.mapping);
        prefer(frame.diagram, &mut self.diagram);
    }

    fn accumulator(&mut self, section: Section) -> &mut String {
        match section {
            Section::Explanation => &mut self.explanation,
            Section::Mapping => &mut self.mapping,
            Section::Diagram => &mut self.diagram,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(frames: Vec<StreamFrame>) -> GenerationState {
        let mut state = GenerationState::started();
        for frame in frames {
            state.apply(frame);
        }
        state
    }

    #[test]
    fn chunks_concatenate_in_arrival_order() {
        let state = run(vec![
            StreamFrame::chunk(Phase::ExplanationChunk, "A"),
            StreamFrame::chunk(Phase::ExplanationChunk, "B"),
        ]);
        assert_eq!(state.explanation, "AB");
        assert_eq!(state.status, Phase::ExplanationChunk);
    }

    #[test]
    fn error_keeps_partial_diagram() {
        let state = run(vec![
            StreamFrame::new(Phase::DiagramSent),
            StreamFrame::chunk(Phase::DiagramChunk, "graph TD;"),
            StreamFrame::chunk(Phase::DiagramChunk, "A-->B"),
            StreamFrame::failure("model overloaded"),
        ]);
        assert_eq!(state.status, Phase::Error);
        assert_eq!(state.error.as_deref(), Some("model overloaded"));
        assert_eq!(state.diagram, "graph TD;A-->B");
    }

    #[test]
    fn complete_prefers_frame_payload() {
        let state = run(vec![
            StreamFrame::chunk(Phase::DiagramChunk, "graph TD;partial"),
            StreamFrame {
                status: Phase::Complete,
                diagram: Some("graph TD;final".into()),
                explanation: Some("why".into()),
                ..StreamFrame::default()
            },
        ]);
        assert_eq!(state.status, Phase::Complete);
        assert_eq!(state.diagram, "graph TD;final");
        assert_eq!(state.explanation, "why");
    }

    #[test]
    fn empty_complete_falls_back_to_accumulated_text() {
        let state = run(vec![
            StreamFrame::chunk(Phase::ExplanationChunk, "streamed why"),
            StreamFrame::chunk(Phase::DiagramChunk, "graph TD;A"),
            StreamFrame {
                status: Phase::Complete,
                diagram: Some(String::new()),
                ..StreamFrame::default()
            },
        ]);
        assert_eq!(state.diagram, "graph TD;A");
        assert_eq!(state.explanation, "streamed why");
    }

    #[test]
    fn terminal_states_absorb_later_frames() {
        let mut state = run(vec![StreamFrame::failure("boom")]);
        assert_eq!(state.apply(StreamFrame::chunk(Phase::DiagramChunk, "x")), Transition::Ignored);
        assert_eq!(state.apply(StreamFrame::new(Phase::Complete)), Transition::Ignored);
        assert_eq!(state.diagram, "");
        assert_eq!(state.status, Phase::Error);

        let mut done = run(vec![StreamFrame::new(Phase::Complete)]);
        done.fail("late");
        assert_eq!(done.status, Phase::Complete);
        assert_eq!(done.error, None);
    }

    #[test]
    fn backward_status_is_ignored_but_message_kept() {
        let mut state = run(vec![
            StreamFrame::new(Phase::MappingSent),
            StreamFrame { message: Some("mapping".into()), ..StreamFrame::new(Phase::Mapping) },
        ]);
        let transition = state.apply(StreamFrame {
            message: Some("stale".into()),
            ..StreamFrame::new(Phase::ExplanationSent)
        });
        assert_eq!(transition, Transition::Ignored);
        assert_eq!(state.status, Phase::Mapping);
        assert_eq!(state.message.as_deref(), Some("mapping"));
    }

    #[test]
    fn late_chunk_still_appends_without_moving_status_back() {
        let state = run(vec![
            StreamFrame::new(Phase::DiagramSent),
            StreamFrame::chunk(Phase::MappingChunk, "late mapping"),
        ]);
        assert_eq!(state.status, Phase::DiagramSent);
        assert_eq!(state.mapping, "late mapping");
    }

    #[test]
    fn full_progression_reaches_complete() {
        let state = run(vec![
            StreamFrame::new(Phase::ExplanationSent),
            StreamFrame::new(Phase::Explanation),
            StreamFrame::chunk(Phase::ExplanationChunk, "E"),
            StreamFrame::new(Phase::MappingSent),
            StreamFrame::new(Phase::Mapping),
            StreamFrame::chunk(Phase::MappingChunk, "M"),
            StreamFrame::new(Phase::DiagramSent),
            StreamFrame::new(Phase::Diagram),
            StreamFrame::chunk(Phase::DiagramChunk, "D"),
            StreamFrame::new(Phase::Complete),
        ]);
        assert_eq!(state.status, Phase::Complete);
        assert_eq!((state.explanation.as_str(), state.mapping.as_str(), state.diagram.as_str()), ("E", "M", "D"));
    }
}

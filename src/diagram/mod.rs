//! Diagram generation: stream decoding, state tracking and orchestration.
//!
//! Leaf to root: [`frame`] and [`recovery`] decode single stream lines,
//! [`parser`] turns raw bytes into frames, [`state`] folds frames into a
//! [`GenerationState`], and [`orchestrator`] combines that with the cache
//! ([`gateway`]), the commit oracle ([`oracle`]) and the freshness policy
//! ([`freshness`]).

pub mod freshness;
pub mod frame;
pub mod gateway;
pub mod inflight;
pub mod oracle;
pub mod orchestrator;
pub mod parser;
pub mod recovery;
pub mod state;

pub use frame::{Phase, StreamFrame};
pub use orchestrator::{DiagramOrchestrator, DiagramOutcome, OutcomeSource};
pub use state::GenerationState;

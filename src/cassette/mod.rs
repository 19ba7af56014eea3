//! Cassettes: recorded port interactions for deterministic replay.
//!
//! A recording session wraps the live adapters and writes one cassette per
//! port; replaying adapters serve those interactions back in order.

pub mod config;
pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;

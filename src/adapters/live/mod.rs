//! Live adapters for real external interactions.

pub mod backend;
pub mod clock;
pub mod credentials;
pub mod filesystem;
pub mod id_gen;
pub mod source_control;

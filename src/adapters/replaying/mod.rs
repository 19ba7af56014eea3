//! Replaying adapters that serve recorded interactions back.

pub mod backend;
pub mod clock;
pub mod filesystem;
pub mod id_gen;
pub mod source_control;

use std::sync::Mutex;

use serde::de::DeserializeOwned;

use crate::cassette::replayer::CassetteReplayer;

pub use backend::ReplayingGenerationBackend;
pub use clock::ReplayingClock;
pub use filesystem::ReplayingFileSystem;
pub use id_gen::ReplayingIdGenerator;
pub use source_control::ReplayingSourceControl;

/// Takes the output of the next `port::method` interaction.
///
/// # Panics
///
/// Panics if the cassette has no further interaction for the pair.
pub(crate) fn next_output(
    replayer: &Mutex<CassetteReplayer>,
    port: &str,
    method: &str,
) -> serde_json::Value {
    let mut guard = replayer.lock().expect("replayer lock poisoned");
    guard.next_interaction(port, method).output
}

/// Rebuilds a typed `Result<T, E>` recorded by `record_typed_result`.
///
/// # Panics
///
/// Panics if the output is not `{"Ok": T}` or `{"Err": E}`.
pub(crate) fn replay_result<T, E>(output: serde_json::Value, context: &str) -> Result<T, E>
where
    T: DeserializeOwned,
    E: DeserializeOwned,
{
    serde_json::from_value(output)
        .unwrap_or_else(|e| panic!("{context}: recorded output is not a result: {e}"))
}

/// Rebuilds a `Result` recorded by `record_result`, where only the error
/// message survived.
///
/// # Panics
///
/// Panics if the output is neither `{"Ok": T}` nor `{"Err": "message"}`.
pub(crate) fn replay_message_result<T>(
    output: serde_json::Value,
    context: &str,
) -> Result<T, Box<dyn std::error::Error + Send + Sync>>
where
    T: DeserializeOwned,
{
    let result: Result<T, String> = replay_result(output, context);
    result.map_err(Into::into)
}

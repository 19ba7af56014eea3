//! Recording adapters that capture interactions to cassettes.

pub mod backend;
pub mod clock;
pub mod filesystem;
pub mod id_gen;
pub mod source_control;

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::cassette::recorder::CassetteRecorder;

pub use backend::RecordingGenerationBackend;
pub use clock::RecordingClock;
pub use filesystem::RecordingFileSystem;
pub use id_gen::RecordingIdGenerator;
pub use source_control::RecordingSourceControl;

/// Record an interaction with a simple (non-Result) return value.
///
/// Mirror of `replaying::next_output`.
pub(crate) fn record_interaction<I, O>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    output: &O,
) where
    I: Serialize,
    O: Serialize,
{
    let output_json = serde_json::to_value(output).expect("failed to serialize recording output");
    push(recorder, port, method, input, output_json);
}

/// Record a `Result<T, E>` whose error only survives as its message.
///
/// `Ok(v)` is stored as `{"Ok": v}` and `Err(e)` as `{"Err": e.to_string()}`.
/// Mirror of `replaying::replay_message_result`.
pub(crate) fn record_result<T, E, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: std::fmt::Display,
    I: Serialize,
{
    let output_json = match result {
        Ok(v) => {
            let inner = serde_json::to_value(v).expect("failed to serialize Ok value");
            serde_json::json!({ "Ok": inner })
        }
        Err(e) => serde_json::json!({ "Err": e.to_string() }),
    };
    push(recorder, port, method, input, output_json);
}

/// Record a `Result<T, E>` whose error type is itself serializable, so the
/// exact variant replays (a rate limit stays a rate limit).
///
/// Mirror of `replaying::replay_result`.
pub(crate) fn record_typed_result<T, E, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: Serialize,
    I: Serialize,
{
    let output_json = serde_json::to_value(result).expect("failed to serialize recorded result");
    push(recorder, port, method, input, output_json);
}

fn push<I: Serialize>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    output: serde_json::Value,
) {
    let input_json = serde_json::to_value(input).expect("failed to serialize recording input");
    let mut guard = recorder.lock().expect("recorder lock poisoned");
    guard.record(port, method, input_json, output);
}

/// Stand-in for a secret in recorded inputs; only its presence is kept.
pub(crate) fn redact(secret: Option<&String>) -> Option<&'static str> {
    secret.map(|_| "<redacted>")
}

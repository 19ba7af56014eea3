//! Replaying adapter for the `GenerationBackend` port.

use std::sync::Mutex;

use bytes::Bytes;
use futures_util::stream;

use super::{next_output, replay_result};
use crate::cassette::format::RecordedStream;
use crate::cassette::replayer::CassetteReplayer;
use crate::error::BackendError;
use crate::ports::{
    ByteStream, CostEstimate, CostFuture, CostRequest, GenerationBackend, GenerationRequest,
    StreamFuture,
};

/// Replays recorded cost estimates and generation streams from a cassette.
///
/// A replayed stream yields the recorded chunks back to back, followed by
/// the recorded mid-stream error if there was one.
pub struct ReplayingGenerationBackend {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingGenerationBackend {
    /// Creates a new replaying backend from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl GenerationBackend for ReplayingGenerationBackend {
    fn estimate_cost(&self, _request: &CostRequest) -> CostFuture<'_> {
        let output = next_output(&self.replayer, "backend", "estimate_cost");
        let result: Result<CostEstimate, BackendError> =
            replay_result(output, "backend::estimate_cost");
        Box::pin(async move { result })
    }

    fn stream(&self, _request: &GenerationRequest) -> StreamFuture<'_> {
        let output = next_output(&self.replayer, "backend", "stream");
        let recorded: Result<RecordedStream, BackendError> =
            replay_result(output, "backend::stream");
        let result = recorded.map(|recorded| {
            let mut items: Vec<Result<Bytes, BackendError>> =
                recorded.chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
            items.extend(recorded.error.map(Err));
            Box::pin(stream::iter(items)) as ByteStream
        });
        Box::pin(async move { result })
    }
}

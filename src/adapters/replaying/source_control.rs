//! Replaying adapter for the `SourceControl` port.

use std::sync::Mutex;

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::error::SourceControlError;
use crate::ports::{BranchFuture, BranchHead, SourceControl};

/// Replays recorded branch heads from a cassette.
pub struct ReplayingSourceControl {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingSourceControl {
    /// Creates a new replaying source-control client from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl SourceControl for ReplayingSourceControl {
    fn branch_head<'a>(
        &'a self,
        _owner: &'a str,
        _repo: &'a str,
        _branch: &'a str,
    ) -> BranchFuture<'a> {
        let output = next_output(&self.replayer, "source_control", "branch_head");
        let result: Result<BranchHead, SourceControlError> =
            replay_result(output, "source_control::branch_head");
        Box::pin(async move { result })
    }
}

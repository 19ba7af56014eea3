//! Recording adapter for the `SourceControl` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_typed_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{BranchFuture, SourceControl};

/// Records branch head lookups while delegating to an inner implementation.
pub struct RecordingSourceControl {
    inner: Arc<dyn SourceControl>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingSourceControl {
    /// Creates a new recording source-control client wrapping the given implementation.
    pub fn new(inner: Arc<dyn SourceControl>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct BranchInput<'a> {
    owner: &'a str,
    repo: &'a str,
    branch: &'a str,
}

impl SourceControl for RecordingSourceControl {
    fn branch_head<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        branch: &'a str,
    ) -> BranchFuture<'a> {
        Box::pin(async move {
            let result = self.inner.branch_head(owner, repo, branch).await;
            let input = BranchInput { owner, repo, branch };
            record_typed_result(&self.recorder, "source_control", "branch_head", &input, &result);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::replaying::ReplayingSourceControl;
    use crate::cassette::config::CassetteConfig;
    use crate::error::SourceControlError;
    use crate::ports::BranchHead;
    use chrono::{TimeZone, Utc};

    struct Fixed;

    impl SourceControl for Fixed {
        fn branch_head<'a>(
            &'a self,
            _owner: &'a str,
            _repo: &'a str,
            branch: &'a str,
        ) -> BranchFuture<'a> {
            let result = if branch == "main" {
                Err(SourceControlError::NotFound)
            } else {
                Ok(BranchHead {
                    branch: branch.to_string(),
                    committed_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
                })
            };
            Box::pin(async move { result })
        }
    }

    #[tokio::test]
    async fn not_found_and_heads_replay_with_their_variants() {
        let dir = std::env::temp_dir().join("gitdiagram_rec_source_control_test");
        let path = dir.join("source_control.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&path, "test", "0.1.0")));

        {
            let sc = RecordingSourceControl::new(Arc::new(Fixed), Arc::clone(&recorder));
            assert!(sc.branch_head("octo", "hello", "main").await.is_err());
            assert!(sc.branch_head("octo", "hello", "master").await.is_ok());
        }

        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
        recorder.finish().unwrap();

        let replay = ReplayingSourceControl::new(CassetteConfig::load_monolithic(&path).unwrap());
        assert_eq!(
            replay.branch_head("octo", "hello", "main").await,
            Err(SourceControlError::NotFound)
        );
        let head = replay.branch_head("octo", "hello", "master").await.unwrap();
        assert_eq!(head.branch, "master");

        let _ = std::fs::remove_dir_all(&dir);
    }
}

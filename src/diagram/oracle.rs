//! Latest-commit lookup used by the freshness policy.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::SourceControlError;
use crate::ports::source_control::SourceControl;

/// Branches tried, in order, when looking for the default branch.
pub const DEFAULT_BRANCHES: [&str; 2] = ["main", "master"];

/// Answers "when was this repository last committed to?".
///
/// Only a not-found answer moves on to the next branch. Any other failure
/// (rate limiting, network) yields `None`, which the freshness policy
/// treats as "regenerate".
#[derive(Clone)]
pub struct CommitOracle {
    source: Arc<dyn SourceControl>,
}

impl CommitOracle {
    /// Creates an oracle over `source`.
    #[must_use]
    pub fn new(source: Arc<dyn SourceControl>) -> Self {
        Self { source }
    }

    /// Committer date of the head of `main`, falling back to `master`.
    pub async fn latest_commit_date(&self, owner: &str, repo: &str) -> Option<DateTime<Utc>> {
        for branch in DEFAULT_BRANCHES {
            match self.source.branch_head(owner, repo, branch).await {
                Ok(head) => return Some(head.committed_at),
                Err(SourceControlError::NotFound) => {
                    debug!(owner, repo, branch, "branch not found");
                }
                Err(err) => {
                    warn!(owner, repo, branch, error = %err, "commit lookup failed");
                    return None;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;
    use crate::ports::source_control::{BranchFuture, BranchHead};

    /// Serves canned answers per branch and remembers which were asked for.
    struct FakeSource {
        main: Result<DateTime<Utc>, SourceControlError>,
        master: Result<DateTime<Utc>, SourceControlError>,
        asked: Mutex<Vec<String>>,
    }

    impl SourceControl for FakeSource {
        fn branch_head<'a>(
            &'a self,
            _owner: &'a str,
            _repo: &'a str,
            branch: &'a str,
        ) -> BranchFuture<'a> {
            self.asked.lock().unwrap().push(branch.to_string());
            let answer = if branch == "main" { self.main.clone() } else { self.master.clone() };
            let branch = branch.to_string();
            Box::pin(async move { answer.map(|committed_at| BranchHead { branch, committed_at }) })
        }
    }

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 8, 30, 0).unwrap()
    }

    fn oracle(
        main: Result<DateTime<Utc>, SourceControlError>,
        master: Result<DateTime<Utc>, SourceControlError>,
    ) -> (CommitOracle, Arc<FakeSource>) {
        let source = Arc::new(FakeSource { main, master, asked: Mutex::new(Vec::new()) });
        (CommitOracle::new(source.clone()), source)
    }

    #[tokio::test]
    async fn uses_main_when_present() {
        let (oracle, source) = oracle(Ok(date()), Err(SourceControlError::NotFound));
        assert_eq!(oracle.latest_commit_date("octo", "hello").await, Some(date()));
        assert_eq!(*source.asked.lock().unwrap(), vec!["main"]);
    }

    #[tokio::test]
    async fn falls_back_to_master_on_not_found() {
        let (oracle, source) = oracle(Err(SourceControlError::NotFound), Ok(date()));
        assert_eq!(oracle.latest_commit_date("octo", "hello").await, Some(date()));
        assert_eq!(*source.asked.lock().unwrap(), vec!["main", "master"]);
    }

    #[tokio::test]
    async fn other_failures_do_not_fall_back() {
        let (oracle, source) = oracle(Err(SourceControlError::RateLimited), Ok(date()));
        assert_eq!(oracle.latest_commit_date("octo", "hello").await, None);
        assert_eq!(*source.asked.lock().unwrap(), vec!["main"]);
    }

    #[tokio::test]
    async fn neither_branch_found() {
        let (oracle, _) = oracle(Err(SourceControlError::NotFound), Err(SourceControlError::NotFound));
        assert_eq!(oracle.latest_commit_date("octo", "hello").await, None);
    }
}

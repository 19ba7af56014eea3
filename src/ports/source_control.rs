//! Source-control port for branch metadata queries.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SourceControlError;

/// Boxed future type alias used by [`SourceControl`] to keep the trait dyn-compatible.
pub type BranchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<BranchHead, SourceControlError>> + Send + 'a>>;

/// The head commit of a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchHead {
    /// Branch that was queried.
    pub branch: String,
    /// Committer date of the head commit.
    pub committed_at: DateTime<Utc>,
}

/// Reads branch heads from a hosted source-control API.
pub trait SourceControl: Send + Sync {
    /// Looks up the head commit of `branch` in `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceControlError::NotFound`] when the branch does not
    /// exist, and other variants for transport or API failures.
    fn branch_head<'a>(&'a self, owner: &'a str, repo: &'a str, branch: &'a str)
        -> BranchFuture<'a>;
}

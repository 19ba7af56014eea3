//! Live adapter for the `SourceControl` port using the GitHub REST API.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::SourceControlError;
use crate::ports::source_control::{BranchFuture, BranchHead, SourceControl};

const GITHUB_API_URL: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("gitdiagram/", env!("CARGO_PKG_VERSION"));
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Live GitHub client. A token is optional and only raises the rate limit.
pub struct GitHubSourceControl {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubSourceControl {
    /// Creates a client against `api.github.com`.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self::with_api_url(GITHUB_API_URL, token)
    }

    /// Creates a client against a GitHub-compatible API root.
    #[must_use]
    pub fn with_api_url(api_url: &str, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    fn branch_url(&self, owner: &str, repo: &str, branch: &str) -> String {
        format!("{}/repos/{owner}/{repo}/branches/{branch}", self.api_url)
    }
}

/// `GET /repos/{owner}/{repo}/branches/{branch}`, reduced to what we read.
#[derive(Deserialize)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(Deserialize)]
struct BranchCommit {
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    committer: Committer,
}

#[derive(Deserialize)]
struct Committer {
    date: DateTime<Utc>,
}

impl SourceControl for GitHubSourceControl {
    fn branch_head<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        branch: &'a str,
    ) -> BranchFuture<'a> {
        Box::pin(async move {
            let mut request = self
                .client
                .get(self.branch_url(owner, repo, branch))
                .header("Accept", GITHUB_ACCEPT)
                .header("User-Agent", USER_AGENT);
            if let Some(token) = &self.token {
                request = request.header("Authorization", format!("token {token}"));
            }

            let response =
                request.send().await.map_err(|e| SourceControlError::Transport(e.to_string()))?;

            let remaining = response
                .headers()
                .get(RATE_LIMIT_REMAINING)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            if let Some(err) = status_error(response.status(), remaining.as_deref()) {
                return Err(err);
            }

            let body: BranchResponse =
                response.json().await.map_err(|e| SourceControlError::Decode(e.to_string()))?;

            Ok(BranchHead {
                branch: branch.to_string(),
                committed_at: body.commit.commit.committer.date,
            })
        })
    }
}

/// Maps a non-success response to a port error.
///
/// GitHub reports an exhausted quota as 403 with no requests remaining, or
/// as 429 for secondary limits.
fn status_error(status: StatusCode, remaining: Option<&str>) -> Option<SourceControlError> {
    match status {
        s if s.is_success() => None,
        StatusCode::NOT_FOUND => Some(SourceControlError::NotFound),
        StatusCode::TOO_MANY_REQUESTS => Some(SourceControlError::RateLimited),
        StatusCode::FORBIDDEN if remaining == Some("0") => Some(SourceControlError::RateLimited),
        s => Some(SourceControlError::Status(s.as_u16())),
    }
}

//! Diagram cache port: persistent key-value storage of generated diagrams.

use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Explanation stored when the backend produced none.
pub const DEFAULT_EXPLANATION: &str = "No explanation provided";

/// Composite cache key. Case is preserved exactly as supplied.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RepoKey {
    /// Repository owner (user or organisation).
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

impl RepoKey {
    /// Creates a key from owner and repository name.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self { owner: owner.into(), repo: repo.into() }
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// One cached diagram row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramRecord {
    /// Repository owner.
    pub username: String,
    /// Repository name.
    pub repo: String,
    /// Mermaid source.
    pub diagram: String,
    /// Free-form rationale produced alongside the diagram.
    #[serde(default = "default_explanation")]
    pub explanation: String,
    /// Whether a user-supplied API key paid for this generation.
    #[serde(default)]
    pub used_own_key: bool,
    /// Set once, when the row is first inserted.
    pub created_at: DateTime<Utc>,
    /// Set on every write.
    pub updated_at: DateTime<Utc>,
}

fn default_explanation() -> String {
    DEFAULT_EXPLANATION.to_string()
}

impl DiagramRecord {
    /// The composite key of this row.
    #[must_use]
    pub fn key(&self) -> RepoKey {
        RepoKey::new(&self.username, &self.repo)
    }

    /// `"owner/repo"`, the string listings search and sort on.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.username, self.repo)
    }
}

/// Values written by an upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramWrite {
    /// Mermaid source.
    pub diagram: String,
    /// Rationale text.
    pub explanation: String,
    /// Whether a user-supplied API key was used.
    pub used_own_key: bool,
}

/// Column a listing is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Lexicographic on `"owner/repo"`.
    Repository,
    /// Chronological on `updated_at`.
    #[default]
    #[value(name = "updated_at")]
    UpdatedAt,
}

/// Listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

/// Parameters of a cache listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Ordering column.
    pub sort_field: SortField,
    /// Ordering direction.
    pub sort_direction: SortDirection,
    /// 1-based page number.
    pub page: usize,
    /// Rows per page.
    pub page_size: usize,
    /// Case-insensitive substring matched against `"owner/repo"`.
    pub search: String,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
            page: 1,
            page_size: 20,
            search: String::new(),
        }
    }
}

/// Pagination metadata returned with a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Rows matching the search, across all pages.
    pub total: usize,
    /// Rows per page.
    pub page_size: usize,
    /// The page that was returned.
    pub current_page: usize,
    /// `ceil(total / page_size)`.
    pub total_pages: usize,
}

/// One page of cached diagrams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachePage {
    /// Rows on this page.
    pub data: Vec<DiagramRecord>,
    /// Pagination info.
    pub pagination: Pagination,
}

/// Persistent storage for generated diagrams.
///
/// Implementations report failures; the fail-open policy lives in
/// [`crate::diagram::gateway::CacheGateway`].
pub trait DiagramCache: Send + Sync {
    /// Fetches the row for `key`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(
        &self,
        key: &RepoKey,
    ) -> Result<Option<DiagramRecord>, Box<dyn std::error::Error + Send + Sync>>;

    /// Inserts or overwrites the row for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected or cannot be persisted.
    fn upsert(
        &self,
        key: &RepoKey,
        write: &DiagramWrite,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns one page of rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn list(&self, query: &ListQuery) -> Result<CachePage, Box<dyn std::error::Error + Send + Sync>>;
}

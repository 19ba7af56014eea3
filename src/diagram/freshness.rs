//! Cache freshness policy.

use chrono::{DateTime, Duration, Utc};

/// Default tolerance, in hours, between a commit and the cached diagram.
pub const DEFAULT_GRACE_HOURS: i64 = 24;

/// Whether a cached diagram may be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessDecision {
    /// The cached diagram is recent enough.
    UseCache,
    /// Generate a new diagram.
    Regenerate,
}

/// Decides between the cache and a fresh generation.
///
/// The cache is used iff a record exists, the latest commit date is known
/// and `updated_at - latest_commit >= -grace`. A diagram written within
/// `grace` before the latest commit is still considered current. An unknown
/// commit date regenerates.
#[must_use]
pub fn decide(
    cached_at: Option<DateTime<Utc>>,
    latest_commit: Option<DateTime<Utc>>,
    grace: Duration,
) -> FreshnessDecision {
    match (cached_at, latest_commit) {
        (Some(updated), Some(commit)) if updated - commit >= -grace => FreshnessDecision::UseCache,
        _ => FreshnessDecision::Regenerate,
    }
}

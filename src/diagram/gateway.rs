//! Fail-open access to the diagram cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::ports::cache::{CachePage, DiagramCache, DiagramRecord, DiagramWrite, ListQuery, RepoKey};
use crate::store::paginate;

/// Wraps a [`DiagramCache`] so store failures never reach the caller.
///
/// Read failures look like a miss, write failures are logged and reported
/// as `false`, and a failed listing is an empty page.
#[derive(Clone)]
pub struct CacheGateway {
    store: Arc<dyn DiagramCache>,
}

impl CacheGateway {
    /// Wraps `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DiagramCache>) -> Self {
        Self { store }
    }

    /// Looks up the cached diagram for `key`.
    #[must_use]
    pub fn get(&self, key: &RepoKey) -> Option<DiagramRecord> {
        match self.store.get(key) {
            Ok(record) => record,
            Err(err) => {
                warn!(repo = %key, error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Writes a diagram for `key`. Returns whether the write landed.
    pub fn put(&self, key: &RepoKey, write: &DiagramWrite) -> bool {
        match self.store.upsert(key, write) {
            Ok(()) => true,
            Err(err) => {
                warn!(repo = %key, error = %err, "cache write failed");
                false
            }
        }
    }

    /// One page of cached diagrams.
    #[must_use]
    pub fn list(&self, query: &ListQuery) -> CachePage {
        self.store.list(query).unwrap_or_else(|err| {
            warn!(error = %err, "cache listing failed");
            paginate(Vec::new(), query)
        })
    }

    /// When the diagram for `key` was last written.
    #[must_use]
    pub fn last_generated(&self, key: &RepoKey) -> Option<DateTime<Utc>> {
        self.get(key).map(|record| record.updated_at)
    }
}

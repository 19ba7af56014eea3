//! Diagram cache table: file-backed implementation of the `DiagramCache` port.
//!
//! The whole table is one YAML document written through the `FileSystem`
//! port, keyed on `(username, repo)`:
//!
//! ```text
//! <data_dir>/
//!   ├── diagram_cache.yaml
//!   └── credentials.yaml
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::ports::cache::{
    CachePage, DiagramCache, DiagramRecord, DiagramWrite, ListQuery, Pagination, RepoKey,
    SortDirection, SortField,
};
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;

/// File name of the cache table inside the data directory.
pub const CACHE_FILE_NAME: &str = "diagram_cache.yaml";

/// Column bound for `diagram` and `explanation`.
pub const MAX_TEXT_LEN: usize = 10_000;

/// On-disk shape of the cache table.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheTable {
    #[serde(default)]
    rows: Vec<DiagramRecord>,
}

/// Cache table persisted as YAML through the `FileSystem` port.
///
/// Writes are read-modify-write under a process-local lock, so two upserts
/// for the same key never produce two rows.
pub struct FileDiagramCache {
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileDiagramCache {
    /// Creates a cache table stored at `<data_dir>/diagram_cache.yaml`.
    pub fn new(fs: Arc<dyn FileSystem>, clock: Arc<dyn Clock>, data_dir: &Path) -> Self {
        Self { fs, clock, path: data_dir.join(CACHE_FILE_NAME), write_lock: Mutex::new(()) }
    }

    fn load_table(&self) -> Result<CacheTable, Box<dyn std::error::Error + Send + Sync>> {
        if !self.fs.exists(&self.path) {
            return Ok(CacheTable::default());
        }
        let contents = self.fs.read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(CacheTable::default());
        }
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse cache table {}: {e}", self.path.display()).into())
    }

    fn save_table(&self, table: &CacheTable) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let yaml = serde_yaml::to_string(table)
            .map_err(|e| format!("Failed to serialize cache table: {e}"))?;
        self.fs
            .write(&self.path, &yaml)
            .map_err(|e| format!("Failed to write cache table {}: {e}", self.path.display()).into())
    }
}

fn check_length(column: &str, value: &str) -> Result<(), String> {
    let len = value.chars().count();
    if len > MAX_TEXT_LEN {
        return Err(format!("{column} is {len} characters, column limit is {MAX_TEXT_LEN}"));
    }
    Ok(())
}

impl DiagramCache for FileDiagramCache {
    fn get(
        &self,
        key: &RepoKey,
    ) -> Result<Option<DiagramRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let table = self.load_table()?;
        Ok(table.rows.into_iter().find(|row| row.key() == *key))
    }

    fn upsert(
        &self,
        key: &RepoKey,
        write: &DiagramWrite,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        check_length("diagram", &write.diagram)?;
        check_length("explanation", &write.explanation)?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut table = self.load_table()?;
        let now = self.clock.now();

        match table.rows.iter_mut().find(|row| row.key() == *key) {
            Some(row) => {
                row.diagram.clone_from(&write.diagram);
                row.explanation.clone_from(&write.explanation);
                row.used_own_key = write.used_own_key;
                row.updated_at = now;
            }
            None => table.rows.push(DiagramRecord {
                username: key.owner.clone(),
                repo: key.repo.clone(),
                diagram: write.diagram.clone(),
                explanation: write.explanation.clone(),
                used_own_key: write.used_own_key,
                created_at: now,
                updated_at: now,
            }),
        }

        self.save_table(&table)
    }

    fn list(&self, query: &ListQuery) -> Result<CachePage, Box<dyn std::error::Error + Send + Sync>> {
        let table = self.load_table()?;
        Ok(paginate(table.rows, query))
    }
}

/// Filters, sorts and slices rows for one listing page.
///
/// Pages are 1-based; a page past the end yields no rows but still reports
/// the true totals. A zero page size is treated as one.
#[must_use]
pub fn paginate(rows: Vec<DiagramRecord>, query: &ListQuery) -> CachePage {
    let needle = query.search.to_lowercase();
    let mut matching: Vec<DiagramRecord> = rows
        .into_iter()
        .filter(|row| needle.is_empty() || row.full_name().to_lowercase().contains(&needle))
        .collect();

    matching.sort_by(|a, b| {
        let ord = match query.sort_field {
            SortField::Repository => a.full_name().cmp(&b.full_name()),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        let ord = ord.then_with(|| a.full_name().cmp(&b.full_name()));
        match query.sort_direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    let page_size = query.page_size.max(1);
    let page = query.page.max(1);
    let total = matching.len();
    let total_pages = total.div_ceil(page_size);

    let data = matching.into_iter().skip((page - 1) * page_size).take(page_size).collect();

    CachePage {
        data,
        pagination: Pagination { total, page_size, current_page: page, total_pages },
    }
}

//! Runtime settings read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::diagram::freshness::DEFAULT_GRACE_HOURS;

/// Default generation backend.
pub const DEFAULT_API_URL: &str = "https://api.gitdiagram.com";

/// Default directory for the cache table and credentials.
pub const DEFAULT_HOME: &str = ".gitdiagram";

/// Default idle timeout for a stream read, in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 120;

/// Everything configurable about a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the generation backend (`GITDIAGRAM_API_URL`).
    pub api_url: String,
    /// Token for GitHub API calls made by the commit oracle (`GITHUB_PAT`).
    pub github_pat: Option<String>,
    /// Data directory (`GITDIAGRAM_HOME`).
    pub home: PathBuf,
    /// Freshness tolerance in hours (`GITDIAGRAM_CACHE_GRACE_HOURS`).
    pub cache_grace_hours: i64,
    /// Longest wait for the next stream chunk (`GITDIAGRAM_STREAM_IDLE_TIMEOUT_SECS`).
    pub stream_idle_timeout: Duration,
    /// Directory to record cassettes into (`GITDIAGRAM_RECORD`).
    pub record_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            github_pat: None,
            home: PathBuf::from(DEFAULT_HOME),
            cache_grace_hours: DEFAULT_GRACE_HOURS,
            stream_idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            record_dir: None,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        if let Some(url) = get("GITDIAGRAM_API_URL") {
            settings.api_url = url.trim_end_matches('/').to_string();
        }
        settings.github_pat = get("GITHUB_PAT");
        if let Some(home) = get("GITDIAGRAM_HOME") {
            settings.home = PathBuf::from(home);
        }
        if let Some(hours) = get("GITDIAGRAM_CACHE_GRACE_HOURS") {
            settings.cache_grace_hours = parse_number("GITDIAGRAM_CACHE_GRACE_HOURS", &hours)?;
        }
        if let Some(secs) = get("GITDIAGRAM_STREAM_IDLE_TIMEOUT_SECS") {
            let secs: u64 = parse_number("GITDIAGRAM_STREAM_IDLE_TIMEOUT_SECS", &secs)?;
            if secs == 0 {
                return Err("GITDIAGRAM_STREAM_IDLE_TIMEOUT_SECS must be greater than zero".into());
            }
            settings.stream_idle_timeout = Duration::from_secs(secs);
        }
        settings.record_dir = get("GITDIAGRAM_RECORD").map(PathBuf::from);

        Ok(settings)
    }

    /// Path of the diagram cache table.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.home.clone()
    }

    /// Path of the credentials file.
    #[must_use]
    pub fn credentials_path(&self) -> PathBuf {
        self.home.join("credentials.yaml")
    }

    /// Freshness tolerance as a duration.
    #[must_use]
    pub fn cache_grace(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cache_grace_hours)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, String> {
    value.trim().parse().map_err(|_| format!("{name} must be a number, got {value:?}"))
}

//! Cassette configuration for composable per-port replay.

use std::path::{Path, PathBuf};

use super::format::Cassette;
use super::replayer::CassetteReplayer;

/// Port names, in the order cassette files are written and loaded.
pub const PORTS: [&str; 5] = ["clock", "fs", "id_gen", "source_control", "backend"];

/// Per-port cassette file paths. Ports without a cassette path panic if
/// called during replay.
#[derive(Debug, Clone, Default)]
pub struct CassetteConfig {
    /// Clock cassette.
    pub clock: Option<PathBuf>,
    /// Filesystem cassette (cache table and credentials file).
    pub fs: Option<PathBuf>,
    /// ID generator cassette.
    pub id_gen: Option<PathBuf>,
    /// Source-control cassette (branch head lookups).
    pub source_control: Option<PathBuf>,
    /// Generation backend cassette (cost and stream calls).
    pub backend: Option<PathBuf>,
}

/// Per-port replayers, each with its own interaction stream.
pub struct PortReplayers {
    /// Replayer for the clock port.
    pub clock: Option<CassetteReplayer>,
    /// Replayer for the filesystem port.
    pub fs: Option<CassetteReplayer>,
    /// Replayer for the ID generator port.
    pub id_gen: Option<CassetteReplayer>,
    /// Replayer for the source-control port.
    pub source_control: Option<CassetteReplayer>,
    /// Replayer for the generation backend port.
    pub backend: Option<CassetteReplayer>,
}

impl CassetteConfig {
    /// Returns a config where all port paths are `None`.
    #[must_use]
    pub fn panic_on_unspecified() -> Self {
        Self::default()
    }

    /// Picks up every `<port>.cassette.yaml` present in `dir`, the layout a
    /// recording session writes.
    #[must_use]
    pub fn from_dir(dir: &Path) -> Self {
        let find = |port: &str| {
            let path = dir.join(format!("{port}.cassette.yaml"));
            path.exists().then_some(path)
        };
        Self {
            clock: find("clock"),
            fs: find("fs"),
            id_gen: find("id_gen"),
            source_control: find("source_control"),
            backend: find("backend"),
        }
    }

    /// Load a cassette file and create a replayer over all its interactions.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_monolithic(path: &Path) -> Result<CassetteReplayer, String> {
        Ok(CassetteReplayer::new(&Self::read_cassette(path)?))
    }

    /// Read and parse a cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn read_cassette(path: &Path) -> Result<Cassette, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))
    }

    /// Load all configured per-port cassette files and create replayers.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn load_all(&self) -> Result<PortReplayers, String> {
        let load = |path: &Option<PathBuf>| path.as_deref().map(Self::load_monolithic).transpose();
        Ok(PortReplayers {
            clock: load(&self.clock)?,
            fs: load(&self.fs)?,
            id_gen: load(&self.id_gen)?,
            source_control: load(&self.source_control)?,
            backend: load(&self.backend)?,
        })
    }
}

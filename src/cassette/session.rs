//! Recording session managing per-port cassette recorders.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::recorder::CassetteRecorder;

/// Manages one `CassetteRecorder` per port for a recording session.
///
/// All cassettes land in a timestamped directory under the directory
/// given to [`RecordingSession::new`], one `<port>.cassette.yaml` each.
pub struct RecordingSession {
    /// Recorder for clock interactions.
    pub clock: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for filesystem interactions.
    pub fs: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for ID generator interactions.
    pub id_gen: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for source-control interactions.
    pub source_control: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for generation backend interactions.
    pub backend: Arc<Mutex<CassetteRecorder>>,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Creates `<root>/<timestamp>/` and a recorder per port.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamped directory already exists or
    /// cannot be created.
    pub fn new(root: &Path) -> Result<Self, String> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let output_dir = root.join(&timestamp);

        if output_dir.exists() {
            return Err(format!("Cassette directory already exists: {}", output_dir.display()));
        }
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| format!("Failed to create cassette directory: {e}"))?;

        let version = env!("CARGO_PKG_VERSION");
        let make_recorder = |port: &str| -> Arc<Mutex<CassetteRecorder>> {
            let path = output_dir.join(format!("{port}.cassette.yaml"));
            let name = format!("{timestamp}-{port}");
            Arc::new(Mutex::new(CassetteRecorder::new(path, name, version)))
        };

        Ok(Self {
            clock: make_recorder("clock"),
            fs: make_recorder("fs"),
            id_gen: make_recorder("id_gen"),
            source_control: make_recorder("source_control"),
            backend: make_recorder("backend"),
            output_dir,
        })
    }

    /// Directory the cassettes are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every port's cassette file and returns the output directory.
    ///
    /// All adapters holding a recorder must have been dropped first.
    ///
    /// # Errors
    ///
    /// Returns an error if a recorder is still shared or a file cannot be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        fn finish_one(arc: Arc<Mutex<CassetteRecorder>>, port: &str) -> Result<(), String> {
            let recorder = Arc::try_unwrap(arc)
                .map_err(|_| format!("Recording adapter for {port} still has references"))?
                .into_inner()
                .map_err(|e| format!("Recorder lock for {port} poisoned: {e}"))?;
            recorder.finish().map_err(|e| format!("Failed to write {port} cassette: {e}"))?;
            Ok(())
        }

        finish_one(self.clock, "clock")?;
        finish_one(self.fs, "fs")?;
        finish_one(self.id_gen, "id_gen")?;
        finish_one(self.source_control, "source_control")?;
        finish_one(self.backend, "backend")?;

        Ok(self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::config::CassetteConfig;

    #[test]
    fn session_writes_one_cassette_per_port() {
        let root = std::env::temp_dir().join("gitdiagram_session_test");
        let _ = std::fs::remove_dir_all(&root);

        let session = RecordingSession::new(&root).unwrap();
        assert!(session.output_dir().exists());
        session.backend.lock().unwrap().record(
            "backend",
            "estimate_cost",
            serde_json::json!({}),
            serde_json::json!({"Ok": {"cost": "$0.01"}}),
        );

        let dir = session.finish().unwrap();
        let config = CassetteConfig::from_dir(&dir);
        assert!(config.clock.is_some());
        assert!(config.backend.is_some());

        let cassette = CassetteConfig::read_cassette(&dir.join("backend.cassette.yaml")).unwrap();
        assert_eq!(cassette.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(cassette.interactions.len(), 1);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn finish_fails_while_an_adapter_holds_a_recorder() {
        let root = std::env::temp_dir().join("gitdiagram_session_shared_test");
        let _ = std::fs::remove_dir_all(&root);

        let session = RecordingSession::new(&root).unwrap();
        let held = Arc::clone(&session.clock);
        let err = session.finish().unwrap_err();
        assert!(err.contains("clock still has references"));
        drop(held);

        let _ = std::fs::remove_dir_all(&root);
    }
}

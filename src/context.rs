//! Service context bundling all port trait objects.

use std::path::Path;
use std::sync::Arc;

use crate::adapters::live::backend::LiveGenerationBackend;
use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::credentials::FileCredentialStore;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::adapters::live::source_control::GitHubSourceControl;
use crate::adapters::recording::{
    RecordingClock, RecordingFileSystem, RecordingGenerationBackend, RecordingIdGenerator,
    RecordingSourceControl,
};
use crate::adapters::replaying::{
    ReplayingClock, ReplayingFileSystem, ReplayingGenerationBackend, ReplayingIdGenerator,
    ReplayingSourceControl,
};
use crate::cassette::config::CassetteConfig;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::session::RecordingSession;
use crate::config::Settings;
use crate::credentials::CredentialProvider;
use crate::ports::{
    BranchFuture, Clock, CostFuture, CostRequest, DiagramCache, FileSystem, GenerationBackend,
    GenerationRequest, IdGenerator, SourceControl, StreamFuture,
};
use crate::store::FileDiagramCache;

/// Bundles all port trait objects into a single context.
///
/// Ports are shared (`Arc`) because every orchestrator built from the
/// context holds its own handles. The cache table and the credential
/// store are layered on top of `fs` and `clock`, so recording or replaying
/// those two covers them as well.
pub struct ServiceContext {
    /// Settings the context was built from.
    pub settings: Settings,
    /// Clock for cache timestamps.
    pub clock: Arc<dyn Clock>,
    /// Filesystem under the cache table and credentials file.
    pub fs: Arc<dyn FileSystem>,
    /// ID generator for tagging generation calls.
    pub id_gen: Arc<dyn IdGenerator>,
    /// Branch head lookups for the freshness check.
    pub source_control: Arc<dyn SourceControl>,
    /// The generation backend.
    pub backend: Arc<dyn GenerationBackend>,
    /// The diagram cache table.
    pub cache: Arc<dyn DiagramCache>,
    /// The user's stored keys.
    pub credentials: Arc<CredentialProvider>,
}

impl ServiceContext {
    /// Builds a context from explicit ports, layering the file-backed cache
    /// table and credential store over `fs`.
    #[must_use]
    pub fn assemble(
        settings: Settings,
        clock: Arc<dyn Clock>,
        fs: Arc<dyn FileSystem>,
        id_gen: Arc<dyn IdGenerator>,
        source_control: Arc<dyn SourceControl>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        let cache: Arc<dyn DiagramCache> =
            Arc::new(FileDiagramCache::new(Arc::clone(&fs), Arc::clone(&clock), &settings.data_dir()));
        let store = FileCredentialStore::new(Arc::clone(&fs), &settings.credentials_path());
        let credentials = Arc::new(CredentialProvider::load(Arc::new(store)));

        Self { settings, clock, fs, id_gen, source_control, backend, cache, credentials }
    }

    /// Creates a context talking to the real filesystem, GitHub and backend.
    #[must_use]
    pub fn live(settings: Settings) -> Self {
        let source_control = Arc::new(GitHubSourceControl::new(settings.github_pat.clone()));
        let backend = Arc::new(LiveGenerationBackend::new(&settings.api_url));
        Self::assemble(
            settings,
            Arc::new(LiveClock),
            Arc::new(LiveFileSystem),
            Arc::new(LiveIdGenerator),
            source_control,
            backend,
        )
    }

    /// Creates a live context whose every port call is recorded into a new
    /// session under `root`.
    ///
    /// Drop the context (and anything built from it) before calling
    /// [`RecordingSession::finish`].
    ///
    /// # Errors
    ///
    /// Returns an error if the session directory cannot be created.
    pub fn recording_at(settings: Settings, root: &Path) -> Result<(Self, RecordingSession), String> {
        let session = RecordingSession::new(root)?;

        let clock = Arc::new(RecordingClock::new(Arc::new(LiveClock), Arc::clone(&session.clock)));
        let fs = Arc::new(RecordingFileSystem::new(
            Arc::new(LiveFileSystem),
            Arc::clone(&session.fs),
        ));
        let id_gen = Arc::new(RecordingIdGenerator::new(
            Arc::new(LiveIdGenerator),
            Arc::clone(&session.id_gen),
        ));
        let source_control = Arc::new(RecordingSourceControl::new(
            Arc::new(GitHubSourceControl::new(settings.github_pat.clone())),
            Arc::clone(&session.source_control),
        ));
        let backend = Arc::new(RecordingGenerationBackend::new(
            Arc::new(LiveGenerationBackend::new(&settings.api_url)),
            Arc::clone(&session.backend),
        ));

        let ctx = Self::assemble(settings, clock, fs, id_gen, source_control, backend);
        Ok((ctx, session))
    }

    /// Creates a replaying context from a single cassette holding every port.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(settings: Settings, path: &Path) -> Result<Self, String> {
        let cassette = CassetteConfig::read_cassette(path)?;
        let replayer = || CassetteReplayer::new(&cassette);

        Ok(Self::assemble(
            settings,
            Arc::new(ReplayingClock::new(replayer())),
            Arc::new(ReplayingFileSystem::new(replayer())),
            Arc::new(ReplayingIdGenerator::new(replayer())),
            Arc::new(ReplayingSourceControl::new(replayer())),
            Arc::new(ReplayingGenerationBackend::new(replayer())),
        ))
    }

    /// Creates a replaying context from per-port cassette files.
    ///
    /// Ports without a configured cassette panic with a clear message when
    /// called.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn replaying_from(settings: Settings, config: &CassetteConfig) -> Result<Self, String> {
        let replayers = config.load_all()?;

        let clock: Arc<dyn Clock> = match replayers.clock {
            Some(r) => Arc::new(ReplayingClock::new(r)),
            None => Arc::new(PanickingClock),
        };
        let fs: Arc<dyn FileSystem> = match replayers.fs {
            Some(r) => Arc::new(ReplayingFileSystem::new(r)),
            None => Arc::new(PanickingFileSystem),
        };
        let id_gen: Arc<dyn IdGenerator> = match replayers.id_gen {
            Some(r) => Arc::new(ReplayingIdGenerator::new(r)),
            None => Arc::new(PanickingIdGenerator),
        };
        let source_control: Arc<dyn SourceControl> = match replayers.source_control {
            Some(r) => Arc::new(ReplayingSourceControl::new(r)),
            None => Arc::new(PanickingSourceControl),
        };
        let backend: Arc<dyn GenerationBackend> = match replayers.backend {
            Some(r) => Arc::new(ReplayingGenerationBackend::new(r)),
            None => Arc::new(PanickingGenerationBackend),
        };

        Ok(Self::assemble(settings, clock, fs, id_gen, source_control, backend))
    }
}

// --- Panicking adapters for unspecified ports ---

fn unconfigured(port: &str) -> ! {
    panic!("{port} port not configured in CassetteConfig: no cassette loaded for it");
}

struct PanickingClock;
impl Clock for PanickingClock {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        unconfigured("clock")
    }
}

struct PanickingFileSystem;
impl FileSystem for PanickingFileSystem {
    fn read_to_string(
        &self,
        _path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        unconfigured("fs")
    }
    fn write(
        &self,
        _path: &Path,
        _contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        unconfigured("fs")
    }
    fn exists(&self, _path: &Path) -> bool {
        unconfigured("fs")
    }
}

struct PanickingIdGenerator;
impl IdGenerator for PanickingIdGenerator {
    fn generate_id(&self) -> String {
        unconfigured("id_gen")
    }
}

struct PanickingSourceControl;
impl SourceControl for PanickingSourceControl {
    fn branch_head<'a>(
        &'a self,
        _owner: &'a str,
        _repo: &'a str,
        _branch: &'a str,
    ) -> BranchFuture<'a> {
        unconfigured("source_control")
    }
}

struct PanickingGenerationBackend;
impl GenerationBackend for PanickingGenerationBackend {
    fn estimate_cost(&self, _request: &CostRequest) -> CostFuture<'_> {
        unconfigured("backend")
    }
    fn stream(&self, _request: &GenerationRequest) -> StreamFuture<'_> {
        unconfigured("backend")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use crate::ports::RepoKey;
    use chrono::Utc;
    use serde_json::json;
    use std::path::PathBuf;

    fn write_cassette(path: &Path, interactions: Vec<Interaction>) {
        let cassette = Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            version: "0.1.0".into(),
            interactions,
        };
        std::fs::write(path, serde_yaml::to_string(&cassette).unwrap()).unwrap();
    }

    fn interaction(seq: u64, port: &str, method: &str, output: serde_json::Value) -> Interaction {
        Interaction { seq, port: port.into(), method: method.into(), input: json!({}), output }
    }

    fn settings(home: &str) -> Settings {
        Settings { home: PathBuf::from(home), ..Settings::default() }
    }

    #[test]
    fn replaying_context_from_monolithic_cassette() {
        let dir = std::env::temp_dir().join("gitdiagram_ctx_test_mono");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("full.cassette.yaml");

        // The credential store reads once during assembly.
        write_cassette(
            &path,
            vec![
                interaction(0, "fs", "exists", json!(false)),
                interaction(1, "clock", "now", json!("2024-06-15T10:30:00Z")),
                interaction(2, "id_gen", "generate_id", json!("gen-001")),
                interaction(3, "fs", "exists", json!(true)),
                interaction(4, "fs", "read_to_string", json!({"Ok": "rows: []\n"})),
            ],
        );

        let ctx = ServiceContext::replaying(settings("/replay"), &path).unwrap();
        assert_eq!(ctx.clock.now().to_rfc3339(), "2024-06-15T10:30:00+00:00");
        assert_eq!(ctx.id_gen.generate_id(), "gen-001");
        assert_eq!(ctx.credentials.current().api_key, None);
        assert_eq!(ctx.cache.get(&RepoKey::new("octo", "hello")).unwrap(), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn replaying_from_per_port_cassettes() {
        let dir = std::env::temp_dir().join("gitdiagram_ctx_test_ports");
        std::fs::create_dir_all(&dir).unwrap();

        let fs_path = dir.join("fs.cassette.yaml");
        write_cassette(&fs_path, vec![interaction(0, "fs", "exists", json!(false))]);
        let id_path = dir.join("id_gen.cassette.yaml");
        write_cassette(&id_path, vec![interaction(0, "id_gen", "generate_id", json!("gen-7"))]);

        let config = CassetteConfig::from_dir(&dir);
        let ctx = ServiceContext::replaying_from(settings("/replay"), &config).unwrap();
        assert_eq!(ctx.id_gen.generate_id(), "gen-7");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[should_panic(expected = "not configured in CassetteConfig")]
    fn unspecified_port_panics_with_clear_message() {
        let dir = std::env::temp_dir().join("gitdiagram_ctx_test_unspecified");
        std::fs::create_dir_all(&dir).unwrap();
        let fs_path = dir.join("fs.cassette.yaml");
        write_cassette(&fs_path, vec![interaction(0, "fs", "exists", json!(false))]);

        let config = CassetteConfig { fs: Some(fs_path), ..CassetteConfig::default() };
        let ctx = ServiceContext::replaying_from(settings("/replay"), &config).unwrap();
        let _ = ctx.clock.now();
    }

    #[test]
    fn recording_context_writes_cassettes_after_drop() {
        let root = std::env::temp_dir().join("gitdiagram_ctx_test_recording");
        let _ = std::fs::remove_dir_all(&root);
        let home = root.join("home");

        let (ctx, session) =
            ServiceContext::recording_at(settings(home.to_str().unwrap()), &root.join("cassettes"))
                .unwrap();
        let id = ctx.id_gen.generate_id();
        drop(ctx);

        let dir = session.finish().unwrap();
        let id_cassette = CassetteConfig::read_cassette(&dir.join("id_gen.cassette.yaml")).unwrap();
        assert_eq!(id_cassette.interactions[0].output, json!(id));
        // Assembly probes the credentials file.
        let fs_cassette = CassetteConfig::read_cassette(&dir.join("fs.cassette.yaml")).unwrap();
        assert_eq!(fs_cassette.interactions[0].method, "exists");

        let _ = std::fs::remove_dir_all(&root);
    }
}

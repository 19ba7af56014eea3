//! Record-replay integration tests.
//!
//! Drives the diagram orchestrator entirely from cassettes:
//! 1. A first visit that misses the cache, estimates cost, streams a
//!    generation and writes it back, replayed from one monolithic cassette.
//! 2. The same cassette replayed again yields the same outcome.
//! 3. A rate-limited cost call replayed from per-port cassettes.

use std::path::{Path, PathBuf};

use serde_json::json;

use gitdiagram::cassette::config::CassetteConfig;
use gitdiagram::cassette::recorder::CassetteRecorder;
use gitdiagram::config::Settings;
use gitdiagram::context::ServiceContext;
use gitdiagram::diagram::inflight::InflightRegistry;
use gitdiagram::diagram::{DiagramOrchestrator, DiagramOutcome, OutcomeSource, Phase};
use gitdiagram::ports::cache::RepoKey;

const HOME: &str = "/replay/home";
const WRITTEN_AT: &str = "2025-03-15T14:30:00Z";

fn settings() -> Settings {
    Settings { home: PathBuf::from(HOME), ..Settings::default() }
}

fn sse(frame: &serde_json::Value) -> String {
    format!("data: {frame}\n\n")
}

/// Records, in call order per port, a first visit to `octo/hello`.
fn record_first_visit(path: &Path) {
    let mut recorder = CassetteRecorder::new(path, "first-visit", "0.1.0");
    let credentials = format!("{HOME}/credentials.yaml");
    let table = format!("{HOME}/diagram_cache.yaml");

    // Credentials are read once when the context is assembled.
    recorder.record("fs", "exists", json!({"path": credentials}), json!(false));
    // Cache lookup misses.
    recorder.record("fs", "exists", json!({"path": table}), json!(false));
    recorder.record(
        "source_control",
        "branch_head",
        json!({"owner": "octo", "repo": "hello", "branch": "main"}),
        json!({"Ok": {"branch": "main", "committed_at": "2025-03-14T09:00:00Z"}}),
    );
    recorder.record(
        "backend",
        "estimate_cost",
        json!({"username": "octo", "repo": "hello", "instructions": ""}),
        json!({"Ok": {"cost": "$0.02 USD"}}),
    );
    recorder.record("id_gen", "generate_id", json!(null), json!("gen-001"));
    recorder.record(
        "backend",
        "stream",
        json!({"username": "octo", "repo": "hello", "instructions": ""}),
        json!({"Ok": {"chunks": [
            sse(&json!({"status": "started", "message": "Starting generation process..."})),
            sse(&json!({"status": "explanation_chunk", "chunk": "A tiny "})),
            sse(&json!({"status": "explanation_chunk", "chunk": "service."})),
            format!(
                "{}{}",
                sse(&json!({"status": "diagram_chunk", "chunk": "graph TD;"})),
                sse(&json!({"status": "diagram_chunk", "chunk": "A-->B"})),
            ),
            sse(&json!({"status": "complete"})),
        ]}}),
    );
    // Upsert: read-modify-write stamped by the clock.
    recorder.record("fs", "exists", json!({"path": table}), json!(false));
    recorder.record("clock", "now", json!(null), json!(WRITTEN_AT));
    recorder.record("fs", "write", json!({"path": table}), json!({"Ok": null}));
    // Re-read for last_generated.
    recorder.record("fs", "exists", json!({"path": table}), json!(true));
    recorder.record(
        "fs",
        "read_to_string",
        json!({"path": table}),
        json!({"Ok": format!(
            "rows:\n- username: octo\n  repo: hello\n  diagram: graph TD;A-->B\n  explanation: A tiny service.\n  used_own_key: false\n  created_at: {WRITTEN_AT}\n  updated_at: {WRITTEN_AT}\n"
        )}),
    );

    recorder.finish().expect("recording should succeed");
}

async fn replay_load(ctx: &ServiceContext) -> (DiagramOutcome, Phase) {
    let orchestrator =
        DiagramOrchestrator::new(ctx, RepoKey::new("octo", "hello"), InflightRegistry::new());
    let progress = orchestrator.subscribe();
    let outcome = orchestrator.load().await;
    let phase = progress.borrow().status;
    (outcome, phase)
}

#[tokio::test]
async fn replayed_first_visit_generates_and_caches() {
    let dir = std::env::temp_dir().join("gitdiagram_record_replay_first_visit");
    std::fs::create_dir_all(&dir).unwrap();
    let cassette_path = dir.join("first-visit.cassette.yaml");
    record_first_visit(&cassette_path);

    let ctx = ServiceContext::replaying(settings(), &cassette_path).unwrap();
    let (outcome, phase) = replay_load(&ctx).await;

    assert_eq!(outcome.error, None);
    assert_eq!(outcome.source, OutcomeSource::Generation);
    assert_eq!(outcome.diagram, "graph TD;A-->B");
    assert_eq!(outcome.explanation, "A tiny service.");
    assert_eq!(outcome.cost.as_deref(), Some("$0.02 USD"));
    assert_eq!(outcome.last_generated.map(|t| t.to_rfc3339()), Some("2025-03-15T14:30:00+00:00".into()));
    assert_eq!(phase, Phase::Complete);

    // Determinism: a second replay of the same cassette matches exactly.
    let again = ServiceContext::replaying(settings(), &cassette_path).unwrap();
    let (second, _) = replay_load(&again).await;
    assert_eq!(second, outcome);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn rate_limited_cost_replays_from_per_port_cassettes() {
    let dir = std::env::temp_dir().join("gitdiagram_record_replay_rate_limit");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let mut fs = CassetteRecorder::new(dir.join("fs.cassette.yaml"), "fs", "0.1.0");
    fs.record("fs", "exists", json!({}), json!(false));
    fs.record("fs", "exists", json!({}), json!(false));
    fs.finish().unwrap();

    let mut sc =
        CassetteRecorder::new(dir.join("source_control.cassette.yaml"), "source_control", "0.1.0");
    sc.record("source_control", "branch_head", json!({}), json!({"Err": {"kind": "not_found"}}));
    sc.record(
        "source_control",
        "branch_head",
        json!({}),
        json!({"Ok": {"branch": "master", "committed_at": "2025-03-14T09:00:00Z"}}),
    );
    sc.finish().unwrap();

    let mut backend = CassetteRecorder::new(dir.join("backend.cassette.yaml"), "backend", "0.1.0");
    backend.record("backend", "estimate_cost", json!({}), json!({"Err": {"kind": "rate_limited"}}));
    backend.finish().unwrap();

    // No clock or id_gen cassette: a call to either would panic.
    let config = CassetteConfig::from_dir(&dir);
    let ctx = ServiceContext::replaying_from(settings(), &config).unwrap();
    let (outcome, phase) = replay_load(&ctx).await;

    assert_eq!(outcome.error.as_deref(), Some("Rate limit exceeded. Please try again later."));
    assert!(outcome.diagram.is_empty());
    assert_eq!(phase, Phase::Error);

    let _ = std::fs::remove_dir_all(&dir);
}

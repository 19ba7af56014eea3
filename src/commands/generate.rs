//! `gitdiagram generate` command.

use crate::cli::RepoArgs;
use crate::context::ServiceContext;
use crate::diagram::inflight::InflightRegistry;
use crate::diagram::DiagramOrchestrator;
use crate::ports::cache::RepoKey;

use super::{report, with_progress};

/// Execute the `generate` command.
///
/// Serves a fresh cached diagram or generates a new one, echoing progress
/// to stderr and printing the diagram to stdout.
///
/// # Errors
///
/// Returns the user-facing failure message if no diagram was produced.
pub async fn run(ctx: &ServiceContext, repo: &RepoArgs) -> Result<(), String> {
    let key = RepoKey::new(&repo.owner, &repo.repo);
    let orchestrator = DiagramOrchestrator::new(ctx, key, InflightRegistry::new());
    let outcome = with_progress(orchestrator.subscribe(), orchestrator.load()).await;
    report(&outcome)
}

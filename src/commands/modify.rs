//! `gitdiagram modify` and `gitdiagram regenerate` commands.

use crate::cli::RepoArgs;
use crate::context::ServiceContext;
use crate::diagram::inflight::InflightRegistry;
use crate::diagram::DiagramOrchestrator;
use crate::ports::cache::RepoKey;

use super::{report, with_progress};

fn orchestrator(ctx: &ServiceContext, repo: &RepoArgs) -> DiagramOrchestrator {
    DiagramOrchestrator::new(ctx, RepoKey::new(&repo.owner, &repo.repo), InflightRegistry::new())
}

/// Execute the `modify` command.
///
/// # Errors
///
/// Returns the user-facing failure message if the modification failed.
pub async fn run_modify(
    ctx: &ServiceContext,
    repo: &RepoArgs,
    instructions: &str,
) -> Result<(), String> {
    let orchestrator = orchestrator(ctx, repo);
    let outcome = with_progress(orchestrator.subscribe(), orchestrator.modify(instructions)).await;
    report(&outcome)
}

/// Execute the `regenerate` command.
///
/// # Errors
///
/// Returns the user-facing failure message if regeneration failed.
pub async fn run_regenerate(
    ctx: &ServiceContext,
    repo: &RepoArgs,
    instructions: &str,
) -> Result<(), String> {
    let orchestrator = orchestrator(ctx, repo);
    let outcome =
        with_progress(orchestrator.subscribe(), orchestrator.regenerate(instructions)).await;
    report(&outcome)
}

//! `gitdiagram key` command.

use crate::cli::KeyCommand;
use crate::context::ServiceContext;
use crate::diagram::inflight::InflightRegistry;
use crate::diagram::DiagramOrchestrator;
use crate::ports::cache::RepoKey;
use crate::ports::credentials::Credentials;

use super::{report, with_progress};

/// Execute a `key` subcommand.
///
/// # Errors
///
/// Returns an error string if the credentials cannot be saved, or the
/// user-facing failure message of a `--retry` generation.
pub async fn run(ctx: &ServiceContext, command: &KeyCommand) -> Result<(), String> {
    match command {
        KeyCommand::SetApiKey { key, retry: Some(target) } => {
            let [owner, repo] = target.as_slice() else {
                return Err("--retry takes OWNER REPO".to_string());
            };
            let orchestrator =
                DiagramOrchestrator::new(ctx, RepoKey::new(owner, repo), InflightRegistry::new());
            let outcome =
                with_progress(orchestrator.subscribe(), orchestrator.submit_api_key(key)).await;
            report(&outcome)
        }
        KeyCommand::SetApiKey { key, retry: None } => {
            let key = key.trim();
            if key.is_empty() {
                return Err("API key cannot be empty".to_string());
            }
            ctx.credentials.update(|c| c.api_key = Some(key.to_string()))?;
            eprintln!("API key saved.");
            Ok(())
        }
        KeyCommand::SetPat { pat } => {
            let pat = pat.trim();
            if pat.is_empty() {
                return Err("GitHub token cannot be empty".to_string());
            }
            ctx.credentials.update(|c| c.github_pat = Some(pat.to_string()))?;
            eprintln!("GitHub token saved.");
            Ok(())
        }
        KeyCommand::Clear => {
            ctx.credentials.update(|c| *c = Credentials::default())?;
            eprintln!("Stored keys cleared.");
            Ok(())
        }
    }
}

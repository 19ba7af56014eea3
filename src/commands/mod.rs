//! Command dispatch and handlers.

pub mod cache;
pub mod generate;
pub mod key;
pub mod modify;

use std::future::Future;

use tokio::sync::watch;

use crate::cassette::session::RecordingSession;
use crate::cli::Command;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::diagram::{DiagramOutcome, GenerationState, Phase};

/// Dispatch a parsed command to its handler.
///
/// When `GITDIAGRAM_RECORD` is set to a directory path, all port
/// interactions are recorded to per-port cassette files under it.
///
/// # Errors
///
/// Returns an error string if settings are invalid or the command fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let settings = Settings::from_env()?;

    let (ctx, session) = if let Some(root) = settings.record_dir.clone() {
        let (ctx, session) = ServiceContext::recording_at(settings, &root)?;
        (ctx, Some(session))
    } else {
        (ServiceContext::live(settings), None)
    };

    let result = dispatch_with_context(command, &ctx);

    // Finish recording after command completes (even on error)
    if let Some(session) = session {
        // Drop context first to release Arc references
        drop(ctx);
        finish_recording(session)?;
    }

    result
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the command fails.
pub fn dispatch_with_context(command: &Command, ctx: &ServiceContext) -> Result<(), String> {
    match command {
        Command::Generate(repo) => block_on(generate::run(ctx, repo)),
        Command::Modify { repo, instructions } => block_on(modify::run_modify(ctx, repo, instructions)),
        Command::Regenerate { repo, instructions } => {
            block_on(modify::run_regenerate(ctx, repo, instructions))
        }
        Command::Cache { sort, direction, page, page_size, search } => {
            cache::run(ctx, *sort, *direction, *page, *page_size, search)
        }
        Command::Key(command) => block_on(key::run(ctx, command)),
    }
}

/// Runs `future` to completion on a current-thread runtime.
fn block_on<F: Future<Output = Result<(), String>>>(future: F) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;
    runtime.block_on(future)
}

/// Finish a recording session and print the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}

/// Drives `operation` while echoing phase changes from `progress` to stderr.
pub(crate) async fn with_progress<F>(
    progress: watch::Receiver<GenerationState>,
    operation: F,
) -> DiagramOutcome
where
    F: Future<Output = DiagramOutcome>,
{
    tokio::select! {
        biased;
        outcome = operation => outcome,
        () = report_progress(progress) => unreachable!("progress reporting ends only with the orchestrator"),
    }
}

async fn report_progress(mut progress: watch::Receiver<GenerationState>) {
    let mut last = Phase::Idle;
    while progress.changed().await.is_ok() {
        let line = progress_line(&progress.borrow_and_update(), last);
        if let Some((phase, line)) = line {
            last = phase;
            eprintln!("{line}");
        }
    }
    std::future::pending::<()>().await;
}

/// The line to print for `state`, if its phase differs from `last`.
fn progress_line(state: &GenerationState, last: Phase) -> Option<(Phase, String)> {
    if state.status == last || state.status == Phase::Idle {
        return None;
    }
    let line = match &state.message {
        Some(message) if !message.is_empty() => format!("[{}] {message}", state.status),
        _ => format!("[{}]", state.status),
    };
    Some((state.status, line))
}

/// Prints a finished outcome; an outcome carrying an error becomes `Err`.
pub(crate) fn report(outcome: &DiagramOutcome) -> Result<(), String> {
    if let Some(error) = &outcome.error {
        return Err(error.clone());
    }
    if let Some(cost) = &outcome.cost {
        eprintln!("Estimated cost: {cost}");
    }
    if let Some(at) = outcome.last_generated {
        eprintln!("Last generated: {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    println!("{}", outcome.diagram);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::OutcomeSource;

    fn state(status: Phase, message: Option<&str>) -> GenerationState {
        GenerationState { status, message: message.map(str::to_string), ..GenerationState::default() }
    }

    #[test]
    fn progress_line_only_on_phase_change() {
        let s = state(Phase::Started, Some("Starting generation process..."));
        let (phase, line) = progress_line(&s, Phase::Idle).unwrap();
        assert_eq!(phase, Phase::Started);
        assert_eq!(line, "[started] Starting generation process...");

        assert!(progress_line(&s, Phase::Started).is_none());
        assert!(progress_line(&state(Phase::Idle, None), Phase::Started).is_none());
        assert_eq!(
            progress_line(&state(Phase::DiagramChunk, None), Phase::Diagram).unwrap().1,
            "[diagram_chunk]"
        );
    }

    #[test]
    fn outcome_error_becomes_command_error() {
        let outcome = DiagramOutcome {
            diagram: String::new(),
            explanation: String::new(),
            error: Some("Rate limit exceeded. Please try again later.".into()),
            last_generated: None,
            cost: None,
            source: OutcomeSource::Generation,
        };
        assert_eq!(report(&outcome).unwrap_err(), "Rate limit exceeded. Please try again later.");
    }

    #[tokio::test]
    async fn with_progress_returns_the_operation_outcome() {
        let (tx, rx) = watch::channel(GenerationState::default());
        let outcome = with_progress(rx, async move {
            tx.send_replace(state(Phase::Started, None));
            DiagramOutcome {
                diagram: "graph TD;A".into(),
                explanation: String::new(),
                error: None,
                last_generated: None,
                cost: None,
                source: OutcomeSource::Generation,
            }
        })
        .await;
        assert!(outcome.is_success());
    }
}

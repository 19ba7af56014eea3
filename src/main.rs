//! Binary entrypoint for the `gitdiagram` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    gitdiagram::logging::init();

    // Recording is handled in commands::dispatch via GITDIAGRAM_RECORD=<dir>.
    match gitdiagram::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

//! Log output for the binaries.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "gitdiagram=info";

/// Installs a stderr subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops. Stdout is left to
/// command output (diagrams, listings).
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

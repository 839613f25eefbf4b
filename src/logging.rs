/// Logging setup for the crawler binary.
///
/// A single stderr layer: the statistics block goes to stdout, so keeping
/// diagnostics on stderr leaves stdout machine-readable (and `--json` pipeable).
///
/// # Environment Variables
/// * `RUST_LOG` - Controls log level filtering (default: "info")
///   Examples:
///   - `RUST_LOG=debug` - Show every admitted and skipped link
///   - `RUST_LOG=webspider=trace` - Trace for this crate only
///
/// # Panics
/// Panics if the subscriber is already initialized.
use tracing_subscriber::EnvFilter;

pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .expect("default env filter is valid");

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true) // Response workers are named; keep that visible
        .compact()
        .init();
}

//! Logging setup for the CLI.

use tracing_subscriber::EnvFilter;

/// Build the log filter from a level or directive string, falling back to `info`.
pub fn filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the fmt subscriber on stderr so stdout stays machine-readable.
pub fn init(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(log_level))
        .with_writer(std::io::stderr)
        .init();
}

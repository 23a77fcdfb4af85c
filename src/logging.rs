//! Log output for the command line tools.

use std::{env, fs::OpenOptions, io, path::Path, sync::Arc};

use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

const DEFAULT_CONSOLE_DIRECTIVES: &str = "info";

/// Install the global tracing subscriber.
///
/// Events at INFO and above are pretty-printed to stderr, unless `RUST_LOG`
/// holds other filter directives. Events at DEBUG and above are always
/// appended to the file at `log_path`.
///
/// # Errors
/// Returns an error if the log file cannot be opened for appending.
pub fn setup_logging(log_path: &Path) -> Result<(), io::Error> {
    let directives = env::var(EnvFilter::DEFAULT_ENV).ok();

    // Command output goes to stdout, so console logs go to stderr.
    let console_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(io::stderr)
        .with_filter(console_filter(directives.as_deref()));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let debug_log = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file))
        .with_filter(LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(console_log)
        .with(debug_log)
        .init();

    Ok(())
}

/// Build the console filter from `directives`, falling back to INFO when they
/// are missing, blank or malformed.
fn console_filter(directives: Option<&str>) -> EnvFilter {
    match directives.map(str::trim) {
        Some(directives) if !directives.is_empty() => EnvFilter::try_new(directives)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_CONSOLE_DIRECTIVES)),
        _ => EnvFilter::new(DEFAULT_CONSOLE_DIRECTIVES),
    }
}

//! Logging initialization

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn debug_log_file() -> Option<(PathBuf, std::fs::File)> {
    let path = tempfile::Builder::new()
        .prefix("chartscope-")
        .suffix(".log")
        .tempfile()
        .ok()
        .and_then(|f| f.keep().ok())
        .map(|(_, path)| path)
        .unwrap_or_else(|| std::env::temp_dir().join(format!("chartscope-{}.log", std::process::id())));

    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&path)
        .ok()?;
    Some((path, file))
}

/// Initialize logging
///
/// `debug` writes everything at debug level to a temp file and returns its
/// path. Otherwise logs go to stderr at `warn`, or `info` with `verbose`.
/// `RUST_LOG` overrides the level either way.
pub fn init_logging(debug: bool, verbose: bool) -> Option<PathBuf> {
    if debug {
        if let Some((path, file)) = debug_log_file() {
            tracing_subscriber::fmt()
                .with_writer(file)
                .with_env_filter(filter("debug"))
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .init();
            return Some(path);
        }
        eprintln!("Could not create a debug log file, logging to stderr");
    }

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter(level))
        .with_target(false)
        .init();
    None
}

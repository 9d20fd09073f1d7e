//! Logging and tracing configuration
//!
//! Console logs go to stderr so they interleave cleanly with the step
//! progress printed on stdout. A run can additionally be captured into a log
//! file under the platform data directory.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

/// Name of the run log file inside the log directory
const RUN_LOG_FILE: &str = "runs.log";

/// Build the filter from `RUST_LOG`, falling back to the crate default
fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("posture_acceptance=debug,info")
        } else {
            EnvFilter::new("posture_acceptance=info,warn")
        }
    })
}

/// Initialize tracing for the CLI (stderr logging only)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli(verbose: bool) {
    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing for a test run (stderr + run log file)
///
/// The returned guard must be held until the run finishes, otherwise
/// buffered lines are lost. Falls back to stderr only when the log directory
/// cannot be created.
pub fn init_run(verbose: bool) -> Option<(WorkerGuard, PathBuf)> {
    let log_dir = match paths::ensure_log_dir() {
        Ok(Some(dir)) => dir,
        Ok(None) => {
            init_cli(verbose);
            return None;
        }
        Err(e) => {
            eprintln!("Warning: Could not create log directory: {}", e);
            init_cli(verbose);
            return None;
        }
    };

    let appender = tracing_appender::rolling::never(&log_dir, RUN_LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Some((guard, log_dir.join(RUN_LOG_FILE)))
}

//! Logging setup: console output plus a run-scoped log file.
//!
//! The console layer shows info (or debug with `--verbose`); the file layer
//! always records debug so a failed run can be diagnosed afterwards.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Initialize tracing. The returned guard must stay alive for the process
/// lifetime or buffered file log lines are lost.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let console_filter = if verbose {
        EnvFilter::new("fwsdk=debug")
    } else {
        EnvFilter::new("fwsdk=info")
    };

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .without_time()
        .with_filter(console_filter);

    match log_file {
        Some(path) => {
            // Append so an earlier failed run's diagnostics survive the retry.
            let file = std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .with_context(|| format!("failed to open log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(EnvFilter::new("fwsdk=debug"));

            tracing_subscriber::registry()
                .with(console)
                .with(file_layer)
                .init();

            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(console).init();
            Ok(None)
        }
    }
}

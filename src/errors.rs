//! Error taxonomy for provisioning and build orchestration.
//!
//! Every fatal condition in the installer and the build wrapper is one of
//! these variants. They propagate as `anyhow` errors up to `main()`, which
//! prints the chain and exits with code 1; nothing terminates the process
//! from inside a helper.

use thiserror::Error;

/// Categorized fatal errors.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The host OS is not in the supported set. Not retried.
    #[error("your operating system `{0}` is not supported (supported: linux, macos, windows)")]
    UnsupportedHost(String),

    /// The tool catalog is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A download exhausted its retry budget.
    #[error("could not download `{url}` after {attempts} attempts; see the log file for details")]
    Download { url: String, attempts: u32 },

    /// Archive extraction failed. Not retried; a half-extracted destination
    /// is invalid and the operator is expected to re-run a clean install.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The OS facility for setting a persistent variable failed. Variables
    /// that were already set are left as-is; the remaining ones are not set.
    #[error("failed to persist environment variable `{0}`; remaining variables were not set")]
    Persistence(String),

    /// A tool required by the build wrapper is not installed.
    #[error("{tool} is not available on your system\n\nRun `fwsdk setup` to install it.")]
    BuildToolMissing { tool: String },

    /// A configure or build command exited non-zero.
    #[error("build failed: `{command}` exited with a non-zero status")]
    BuildCommand { command: String },
}

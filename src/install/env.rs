//! Staged environment variables and their durable persistence.
//!
//! Variables are accumulated in a [`PendingEnvironment`] while tools are
//! installed and flushed exactly once at the end of a successful run, so a
//! reader can never observe a variable pointing at an incompletely
//! extracted tool. Two strategies:
//!
//! - Windows: `SETX NAME VALUE` per variable; a non-zero exit aborts the
//!   run with the remaining variables left unset.
//! - Linux/macOS: `export NAME=VALUE` lines in `~/.fwsdk_environment`,
//!   plus a one-time guarded snippet in the shell startup file that sources
//!   it. Re-running without `--force` appends, so repeated installs can
//!   accumulate duplicate `export` lines for the same variable; the last
//!   sourced line wins. Known limitation, kept so observable precedence
//!   never changes behind the operator's back.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::host::{HostOs, HostProfile};
use crate::errors::SetupError;
use crate::util::process::ProcessBuilder;

/// Guarded snippet appended once to the shell startup file.
pub const SOURCE_SNIPPET: &str = "\n# source fwsdk environment variables\nif [ -f $HOME/.fwsdk_environment ]; then\n    . $HOME/.fwsdk_environment\nfi\n";

/// Name of the dedicated environment file in the user's home directory.
pub const ENV_FILE_NAME: &str = ".fwsdk_environment";

/// A snapshot of the process environment, injectable for tests.
#[derive(Debug, Clone, Default)]
pub struct EnvMap(HashMap<String, String>);

impl EnvMap {
    /// Snapshot the real process environment.
    pub fn from_process() -> Self {
        EnvMap(std::env::vars().collect())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }
}

/// Where persisted variables land on shell-profile platforms.
#[derive(Debug, Clone)]
pub struct PersistTarget {
    /// The dedicated, tool-owned `export` file.
    pub env_file: PathBuf,

    /// The user's shell startup file; `None` on Windows.
    pub profile_file: Option<PathBuf>,
}

impl PersistTarget {
    /// Resolve the real locations in the user's home directory.
    pub fn for_host(host: &HostProfile) -> Result<Self> {
        let home = crate::install::home_dir()?;
        Ok(PersistTarget {
            env_file: home.join(ENV_FILE_NAME),
            profile_file: host.os.shell_profile().map(|p| home.join(p)),
        })
    }
}

/// Ordered set of environment-variable assignments staged during a run.
///
/// A name appears at most once; re-staging a name overwrites its value in
/// place (last write wins).
#[derive(Debug, Default)]
pub struct PendingEnvironment {
    vars: Vec<(String, String)>,
}

impl PendingEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an assignment.
    pub fn stage(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((name, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Commit all staged variables durably.
    pub fn persist(&self, host: &HostProfile, target: &PersistTarget, force: bool) -> Result<()> {
        if self.is_empty() {
            tracing::debug!("no environment variables to persist");
            return Ok(());
        }

        tracing::info!("setting environment variables...");

        match host.os {
            HostOs::Windows => self.persist_registry(),
            HostOs::Linux | HostOs::Macos => self.persist_shell_profile(target, force),
        }
    }

    /// Windows: one `SETX` per variable, in order.
    fn persist_registry(&self) -> Result<()> {
        for (name, value) in self.iter() {
            tracing::debug!("setting variable '{}={}'", name, value);

            let status = ProcessBuilder::new("SETX").arg(name).arg(value).status()?;
            if !status.success() {
                return Err(SetupError::Persistence(name.to_string()).into());
            }
        }

        tracing::info!(
            "environment variables were added successfully.\n\
             Note: close this command prompt and re-open it to take effect."
        );
        Ok(())
    }

    /// Linux/macOS: export lines plus an idempotent source snippet.
    fn persist_shell_profile(&self, target: &PersistTarget, force: bool) -> Result<()> {
        let mut open = OpenOptions::new();
        if force {
            open.write(true).create(true).truncate(true);
        } else {
            open.append(true).create(true);
            if target.env_file.exists() {
                tracing::debug!(
                    "appending to existing '{}'; duplicate exports are possible (last sourced wins)",
                    target.env_file.display()
                );
            }
        }

        let mut env_file = open
            .open(&target.env_file)
            .with_context(|| format!("failed to open {}", target.env_file.display()))?;

        for (name, value) in self.iter() {
            tracing::debug!("setting variable '{}={}'", name, value);
            writeln!(env_file, "export {}={}", name, value)
                .map_err(|_| SetupError::Persistence(name.to_string()))?;
        }

        let profile = target
            .profile_file
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no shell startup file for this host"))?;

        let profile_text = if profile.exists() {
            std::fs::read_to_string(profile)
                .with_context(|| format!("failed to read {}", profile.display()))?
        } else {
            String::new()
        };

        if profile_text.contains(SOURCE_SNIPPET) {
            tracing::debug!(
                "'{}' is already sourced from '{}'",
                target.env_file.display(),
                profile.display()
            );
        } else {
            tracing::debug!(
                "sourcing '{}' from '{}'",
                target.env_file.display(),
                profile.display()
            );
            let mut profile_file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(profile)
                .with_context(|| format!("failed to open {}", profile.display()))?;
            profile_file
                .write_all(SOURCE_SNIPPET.as_bytes())
                .with_context(|| format!("failed to write {}", profile.display()))?;
        }

        tracing::info!(
            "environment setup completed successfully!\nRun 'source {}'",
            profile.display()
        );
        Ok(())
    }
}

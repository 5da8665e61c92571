//! Requirement probing: decide per tool whether a valid installation
//! already exists.
//!
//! A tool is satisfied only if its root-path variable is set, its version
//! variable (where qualified) is set, and the expected binary exists at the
//! computed path for the current host. Tools without a known probe binary
//! are satisfied by their variables alone. The probe has no side effects
//! and is safe to call repeatedly; the environment is injected so it runs
//! against fakes in tests.

use std::path::{Path, PathBuf};

use crate::core::host::HostProfile;
use crate::core::tool::Tool;
use crate::install::env::EnvMap;

/// Result of probing one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    /// A valid installation exists; the path is the probed binary (or the
    /// install root for tools without one).
    Satisfied(PathBuf),
    /// No valid installation; the tool must be downloaded.
    Missing,
}

/// Probes the environment and filesystem for existing installations.
pub struct Probe<'a> {
    host: &'a HostProfile,
    env: &'a EnvMap,
    force: bool,
}

impl<'a> Probe<'a> {
    pub fn new(host: &'a HostProfile, env: &'a EnvMap, force: bool) -> Self {
        Probe { host, env, force }
    }

    /// Check one tool. With `force` set everything is treated as missing.
    pub fn check(&self, tool: &Tool) -> InstallState {
        if self.force {
            return InstallState::Missing;
        }

        let Some(root) = self.env.get(&tool.root_var()) else {
            return InstallState::Missing;
        };

        let version = match tool.version_var() {
            Some(var) => match self.env.get(&var) {
                Some(v) => Some(v.to_string()),
                None => return InstallState::Missing,
            },
            None => None,
        };

        // No known probe binary for this tool: the variables being set is
        // the whole installation contract.
        let Some(binary) = tool.binary_path(self.host, Path::new(root), version.as_deref()) else {
            return InstallState::Satisfied(PathBuf::from(root));
        };

        if binary.is_file() {
            InstallState::Satisfied(binary)
        } else {
            InstallState::Missing
        }
    }
}

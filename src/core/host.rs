//! Host OS and processor detection.
//!
//! All per-OS knowledge that used to be scattered across the provisioning
//! steps lives here: the executable suffix, the shell startup file, and the
//! catalog key for URL lookup. A `HostProfile` is detected once at startup
//! and is immutable for the process lifetime.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::errors::SetupError;

/// Supported host operating systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
    Linux,
    Macos,
    Windows,
}

impl HostOs {
    /// Key used in the tool catalog for this OS.
    pub fn catalog_key(&self) -> &'static str {
        match self {
            HostOs::Linux => "linux",
            HostOs::Macos => "macos",
            HostOs::Windows => "windows",
        }
    }

    /// Suffix appended to executable names on this OS.
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            HostOs::Windows => ".exe",
            _ => "",
        }
    }

    /// Append the platform executable suffix to a file name.
    pub fn exe(&self, name: &str) -> String {
        format!("{}{}", name, self.exe_suffix())
    }

    /// The interactive shell startup file sourced on login, relative to the
    /// user's home directory. Windows uses persistent registry variables
    /// instead and has no startup file.
    pub fn shell_profile(&self) -> Option<&'static str> {
        match self {
            HostOs::Linux => Some(".bashrc"),
            HostOs::Macos => Some(".bash_profile"),
            HostOs::Windows => None,
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.catalog_key())
    }
}

/// The detected host: OS plus processor architecture string.
#[derive(Debug, Clone)]
pub struct HostProfile {
    pub os: HostOs,
    pub arch: String,
}

impl HostProfile {
    /// Detect the running host. Fails with `UnsupportedHost` for anything
    /// outside the fixed OS set.
    pub fn detect() -> Result<Self> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Build a profile from explicit OS/arch strings (test seam).
    pub fn from_parts(os: &str, arch: &str) -> Result<Self> {
        let os = match os {
            "linux" => HostOs::Linux,
            "macos" => HostOs::Macos,
            "windows" => HostOs::Windows,
            other => return Err(SetupError::UnsupportedHost(other.to_string()).into()),
        };

        Ok(HostProfile {
            os,
            arch: arch.to_string(),
        })
    }

    /// Join a binary name (suffix-adjusted for this OS) onto a directory.
    pub fn binary_in(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(self.os.exe(name))
    }
}

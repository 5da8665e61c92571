//! The tool catalog: a declarative TOML mapping from (tool, host OS,
//! processor architecture, version) to a download URL.
//!
//! Loaded once at startup; a missing or malformed catalog is a fatal
//! configuration error.
//!
//! # Catalog format
//!
//! ```toml
//! [requirements.cmake]
//! linux = "https://example.com/cmake-linux.tar.gz"
//! macos = "https://example.com/cmake-macos.tar.gz"
//! windows = "https://example.com/cmake-windows.zip"
//!
//! # OpenOCD is keyed by processor architecture on macOS.
//! [requirements.openocd.macos]
//! x86_64 = "https://example.com/openocd-macos-x64.tar.bz2"
//! aarch64 = "https://example.com/openocd-macos-arm64.tar.bz2"
//!
//! [toolchains.arm.gcc-arm-none-eabi-7-2018-q2-update]
//! linux = "https://example.com/gcc-arm-linux.tar.bz2"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;

use crate::core::host::HostProfile;
use crate::core::tool::Tool;
use crate::errors::SetupError;

/// A download URL, either flat or keyed by processor architecture.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UrlEntry {
    Plain(String),
    ByArch(BTreeMap<String, String>),
}

impl UrlEntry {
    fn resolve(&self, host: &HostProfile) -> Option<&str> {
        match self {
            UrlEntry::Plain(url) => Some(url),
            UrlEntry::ByArch(by_arch) => by_arch.get(&host.arch).map(String::as_str),
        }
    }
}

/// The declarative tool catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    /// Common requirements: tool name -> host OS -> URL.
    pub requirements: BTreeMap<String, BTreeMap<String, UrlEntry>>,

    /// Cross toolchains: platform -> version -> host OS -> URL.
    pub toolchains: BTreeMap<String, BTreeMap<String, BTreeMap<String, UrlEntry>>>,
}

impl Catalog {
    /// Load the catalog from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SetupError::Configuration(format!(
                "cannot read catalog file `{}`: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&contents)
            .map_err(|e| SetupError::Configuration(format!("{}: {}", path.display(), e)).into())
    }

    /// Parse catalog text.
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Resolve the download URL for a tool on the given host.
    ///
    /// `version` selects the entry for version-qualified cross toolchains
    /// and is ignored for the common requirements.
    pub fn url_for(&self, tool: &Tool, version: &str, host: &HostProfile) -> Result<String> {
        let by_os = match tool {
            Tool::Toolchain(platform) => self
                .toolchains
                .get(platform.as_str())
                .ok_or_else(|| {
                    SetupError::Configuration(format!(
                        "no toolchain entries for platform `{}`",
                        platform
                    ))
                })?
                .get(version)
                .ok_or_else(|| {
                    SetupError::Configuration(format!(
                        "no `{}` toolchain entry for version `{}`",
                        platform, version
                    ))
                })?,
            other => self.requirements.get(other.catalog_key()).ok_or_else(|| {
                SetupError::Configuration(format!("no catalog entry for `{}`", other))
            })?,
        };

        let entry = by_os.get(host.os.catalog_key()).ok_or_else(|| {
            SetupError::Configuration(format!(
                "no download url for `{}` on {}",
                tool.name(),
                host.os
            ))
        })?;

        let url = entry.resolve(host).ok_or_else(|| {
            SetupError::Configuration(format!(
                "no download url for `{}` on {} ({})",
                tool.name(),
                host.os,
                host.arch
            ))
        })?;

        Ok(url.to_string())
    }

    /// Versions the catalog knows for a toolchain platform.
    pub fn toolchain_versions(&self, platform: &str) -> Vec<&str> {
        self.toolchains
            .get(platform)
            .map(|versions| versions.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

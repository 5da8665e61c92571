//! The provisioning engine: requirement probing, retrying download,
//! archive extraction, and persistent environment configuration.
//!
//! One pass per run: probe every required tool, then for each unmet tool
//! download, extract, and stage its environment variables; once every
//! requirement is resolved, flush the staged variables in a single batch.
//! Any download or extraction failure aborts the remaining pipeline.
//! Files already extracted for an earlier tool are left on disk.

pub mod download;
pub mod env;
pub mod extract;
pub mod probe;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::catalog::Catalog;
use crate::core::host::{HostOs, HostProfile};
use crate::core::tool::{TargetPlatform, Tool};
use crate::util::fs::make_executable;

use download::{Downloader, Transport};
use env::{EnvMap, PendingEnvironment, PersistTarget};
use probe::{InstallState, Probe};

/// Environment variable naming the root directory all tools are installed
/// under.
pub const TOOLCHAIN_ROOT_VAR: &str = "FWSDK_TOOLCHAIN_ROOT";

/// User-selected installation options.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Target platform whose cross toolchain to install.
    pub platform: TargetPlatform,

    /// Cross toolchain version identifier.
    pub version: String,

    /// Reinstall everything regardless of environment state.
    pub force: bool,
}

/// What happened to one tool during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Already satisfied; nothing downloaded.
    AlreadyInstalled,
    /// Downloaded and extracted this run.
    Installed,
}

/// Summary of a completed provisioning run.
#[derive(Debug)]
pub struct InstallReport {
    pub outcomes: Vec<(Tool, ToolOutcome)>,
    /// Number of archives fetched this run.
    pub downloads: usize,
}

impl InstallReport {
    /// True when every requirement was already satisfied.
    pub fn all_satisfied(&self) -> bool {
        self.downloads == 0
    }
}

/// The toolchain installer.
///
/// Owns the catalog and the resolved filesystem locations; the process
/// environment and the download transport are injected so the whole run is
/// testable against fakes.
pub struct Installer<'a, T: Transport> {
    catalog: &'a Catalog,
    host: &'a HostProfile,
    opts: InstallOptions,
    downloader: Downloader<T>,
    /// Directory tools are extracted under (`~/fwsdk_toolchain` in a real run).
    dest_root: PathBuf,
    persist: PersistTarget,
}

impl<'a, T: Transport> Installer<'a, T> {
    pub fn new(
        catalog: &'a Catalog,
        host: &'a HostProfile,
        opts: InstallOptions,
        transport: T,
        dest_root: PathBuf,
        persist: PersistTarget,
    ) -> Self {
        Installer {
            catalog,
            host,
            opts,
            downloader: Downloader::new(transport),
            dest_root,
            persist,
        }
    }

    /// The fixed set of required tools, in install order.
    fn required_tools(&self) -> Vec<Tool> {
        vec![
            Tool::Cmake,
            Tool::Ninja,
            Tool::Openocd,
            Tool::Toolchain(self.opts.platform),
        ]
    }

    /// Run the whole pipeline: probe, install unmet tools, persist.
    pub fn run(&self, env: &EnvMap) -> Result<InstallReport> {
        let probe = Probe::new(self.host, env, self.opts.force);

        if self.opts.force {
            tracing::info!("forced install...");
        }

        let mut pending = PendingEnvironment::new();
        if !env.contains(TOOLCHAIN_ROOT_VAR) {
            pending.stage(TOOLCHAIN_ROOT_VAR, self.dest_root.display().to_string());
        }

        let mut outcomes = Vec::new();
        let mut downloads = 0;

        for tool in self.required_tools() {
            match probe.check(&tool) {
                InstallState::Satisfied(path) => {
                    tracing::info!("{} is already installed.", tool);
                    tracing::debug!("{}", path.display());
                    outcomes.push((tool, ToolOutcome::AlreadyInstalled));
                }
                InstallState::Missing => {
                    self.install_tool(&tool, &mut pending)?;
                    downloads += 1;
                    outcomes.push((tool, ToolOutcome::Installed));
                }
            }
        }

        let report = InstallReport {
            outcomes,
            downloads,
        };

        // Nothing changed, nothing to persist.
        if report.all_satisfied() {
            tracing::info!("all requirements are already installed.");
            return Ok(report);
        }

        pending.persist(self.host, &self.persist, self.opts.force)?;

        Ok(report)
    }

    /// Download, extract, and stage variables for one unmet tool.
    fn install_tool(&self, tool: &Tool, pending: &mut PendingEnvironment) -> Result<()> {
        tracing::info!("getting {}...", tool);

        let url = self
            .catalog
            .url_for(tool, &self.opts.version, self.host)?;
        let archive = self.downloader.fetch(&url)?;

        match tool {
            Tool::Cmake => {
                let dest = self.dest_root.join(tool.install_subdir());
                let mut root_dir = extract::extract(&archive, &dest)?;

                // The macOS archive nests the tree one level deeper inside
                // an application bundle.
                if self.host.os == HostOs::Macos {
                    root_dir = format!("{}/Contents", root_dir);
                }
                pending.stage(tool.root_var(), dest.join(root_dir).display().to_string());
            }
            Tool::Ninja => {
                let dest = self.dest_root.join(tool.install_subdir());
                let root_name = extract::extract(&archive, &dest)?;

                // Single-binary archive: the root member is the executable
                // itself and loses its mode bits in transit.
                if self.host.os != HostOs::Windows {
                    make_executable(&dest.join(&root_name))?;
                }
                pending.stage(tool.root_var(), dest.display().to_string());
            }
            Tool::Openocd => {
                let dest = self.dest_root.join(tool.install_subdir());
                let root_dir = extract::extract(&archive, &dest)?;

                pending.stage(tool.root_var(), dest.display().to_string());
                pending.stage(tool.version_var().unwrap(), root_dir);
            }
            Tool::Toolchain(platform) => {
                let toolchain_root = self.dest_root.join(platform.as_str());

                // The Windows archive has no version container directory;
                // extract into one to keep the layout uniform across OSes.
                let dest = if self.host.os == HostOs::Windows {
                    toolchain_root.join(&self.opts.version)
                } else {
                    toolchain_root.clone()
                };
                extract::extract(&archive, &dest)?;

                pending.stage(tool.root_var(), toolchain_root.display().to_string());
                pending.stage(tool.version_var().unwrap(), self.opts.version.clone());
            }
        }

        Ok(())
    }
}

/// Default extraction root: `~/fwsdk_toolchain`.
pub fn default_dest_root() -> Result<PathBuf> {
    Ok(home_dir()?.join("fwsdk_toolchain"))
}

/// The user's home directory.
pub fn home_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("cannot determine the user home directory"))
}

/// Default catalog location: `tools.toml` next to the current executable,
/// falling back to the working directory.
pub fn default_catalog_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|d| d.join("tools.toml")))
        .filter(|p| p.exists())
        .unwrap_or_else(|| Path::new("tools.toml").to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::download::tests::FakeTransport;
    use crate::install::extract::tests::{tar_gz_fixture, zip_fixture};
    use std::collections::HashMap;
    use tempfile::TempDir;

    const ARM_VERSION: &str = "gcc-arm-none-eabi-7-2018-q2-update";

    fn test_catalog() -> Catalog {
        Catalog::parse(
            r#"
[requirements.cmake]
linux = "https://example.com/cmake-root.tar.gz"

[requirements.ninja]
linux = "https://example.com/ninja.zip"

[requirements.openocd]
linux = "https://example.com/openocd-0.11.tar.gz"

[toolchains.arm.gcc-arm-none-eabi-7-2018-q2-update]
linux = "https://example.com/gcc-arm.tar.gz"
"#,
        )
        .unwrap()
    }

    /// Transport serving fixture archives keyed by URL basename.
    fn fixture_transport() -> FakeTransport {
        let mut bodies = HashMap::new();
        bodies.insert(
            "cmake-root.tar.gz".to_string(),
            tar_gz_fixture(&[("cmake-root/bin/cmake", b"cmake-bin" as &[u8])]),
        );
        bodies.insert(
            "ninja.zip".to_string(),
            zip_fixture(&[("ninja", b"ninja-bin")]),
        );
        bodies.insert(
            "openocd-0.11.tar.gz".to_string(),
            tar_gz_fixture(&[("openocd-0.11/bin/openocd", b"ocd-bin")]),
        );
        bodies.insert(
            "gcc-arm.tar.gz".to_string(),
            tar_gz_fixture(&[(
                &format!("{}/bin/arm-none-eabi-gcc", ARM_VERSION),
                b"gcc-bin" as &[u8],
            )]),
        );
        FakeTransport::with_bodies(bodies)
    }

    fn installer_env(tmp: &TempDir) -> (PathBuf, PersistTarget) {
        let dest_root = tmp.path().join("fwsdk_toolchain");
        let persist = PersistTarget {
            env_file: tmp.path().join(".fwsdk_environment"),
            profile_file: Some(tmp.path().join(".bashrc")),
        };
        (dest_root, persist)
    }

    #[test]
    fn test_fresh_install_fetches_and_persists() {
        let tmp = TempDir::new().unwrap();
        let catalog = test_catalog();
        let host = HostProfile::from_parts("linux", "x86_64").unwrap();
        let (dest_root, persist) = installer_env(&tmp);
        let transport = fixture_transport();

        let opts = InstallOptions {
            platform: TargetPlatform::Arm,
            version: ARM_VERSION.to_string(),
            force: false,
        };
        let installer = Installer::new(
            &catalog,
            &host,
            opts,
            transport.clone(),
            dest_root.clone(),
            persist.clone(),
        );

        let report = installer.run(&EnvMap::default()).unwrap();
        assert_eq!(report.downloads, 4);
        assert_eq!(transport.total_requests(), 4);
        assert!(report
            .outcomes
            .iter()
            .all(|(_, outcome)| *outcome == ToolOutcome::Installed));

        // Extracted trees land under the destination root.
        assert!(dest_root.join("cmake/cmake-root/bin/cmake").is_file());
        assert!(dest_root.join("ninja/ninja").is_file());
        assert!(dest_root.join("openocd/openocd-0.11/bin/openocd").is_file());
        assert!(dest_root
            .join(format!("arm/{}/bin/arm-none-eabi-gcc", ARM_VERSION))
            .is_file());

        // Every resolved variable is exported, staged root included.
        let env_file = std::fs::read_to_string(&persist.env_file).unwrap();
        assert!(env_file.contains(&format!(
            "export FWSDK_TOOLCHAIN_ROOT={}",
            dest_root.display()
        )));
        assert!(env_file.contains("export FWSDK_CMAKE_ROOT="));
        assert!(env_file.contains("export FWSDK_NINJA_ROOT="));
        assert!(env_file.contains("export FWSDK_OPENOCD_ROOT="));
        assert!(env_file.contains("export FWSDK_OPENOCD_VERSION=openocd-0.11"));
        assert!(env_file.contains("export FWSDK_ARM_TOOLCHAIN_ROOT="));
        assert!(env_file.contains(&format!(
            "export FWSDK_ARM_TOOLCHAIN_VERSION={}",
            ARM_VERSION
        )));

        let bashrc = std::fs::read_to_string(persist.profile_file.as_ref().unwrap()).unwrap();
        assert!(bashrc.contains(".fwsdk_environment"));
    }

    #[test]
    fn test_second_run_downloads_nothing() {
        let tmp = TempDir::new().unwrap();
        let catalog = test_catalog();
        let host = HostProfile::from_parts("linux", "x86_64").unwrap();
        let (dest_root, persist) = installer_env(&tmp);
        let transport = fixture_transport();

        let opts = InstallOptions {
            platform: TargetPlatform::Arm,
            version: ARM_VERSION.to_string(),
            force: false,
        };
        let installer = Installer::new(
            &catalog,
            &host,
            opts,
            transport.clone(),
            dest_root.clone(),
            persist.clone(),
        );

        installer.run(&EnvMap::default()).unwrap();
        let first_requests = transport.total_requests();
        let env_file_after_first = std::fs::read_to_string(&persist.env_file).unwrap();

        // Second run observes the environment the first run produced.
        let mut env = EnvMap::default();
        env.set(TOOLCHAIN_ROOT_VAR, dest_root.display().to_string());
        env.set(
            "FWSDK_CMAKE_ROOT",
            dest_root.join("cmake/cmake-root").display().to_string(),
        );
        env.set(
            "FWSDK_NINJA_ROOT",
            dest_root.join("ninja").display().to_string(),
        );
        env.set(
            "FWSDK_OPENOCD_ROOT",
            dest_root.join("openocd").display().to_string(),
        );
        env.set("FWSDK_OPENOCD_VERSION", "openocd-0.11");
        env.set(
            "FWSDK_ARM_TOOLCHAIN_ROOT",
            dest_root.join("arm").display().to_string(),
        );
        env.set("FWSDK_ARM_TOOLCHAIN_VERSION", ARM_VERSION);

        let report = installer.run(&env).unwrap();
        assert!(report.all_satisfied());
        assert_eq!(transport.total_requests(), first_requests);
        assert_eq!(report.outcomes.len(), 4);
        assert!(report
            .outcomes
            .iter()
            .all(|(_, outcome)| *outcome == ToolOutcome::AlreadyInstalled));

        // Persistence skipped: the env file is unchanged.
        let env_file_after_second = std::fs::read_to_string(&persist.env_file).unwrap();
        assert_eq!(env_file_after_first, env_file_after_second);
    }

    #[test]
    fn test_download_failure_aborts_without_persisting() {
        let tmp = TempDir::new().unwrap();
        let catalog = test_catalog();
        let host = HostProfile::from_parts("linux", "x86_64").unwrap();
        let (dest_root, persist) = installer_env(&tmp);

        // Transport with no bodies: every fetch fails.
        let transport = FakeTransport::with_bodies(HashMap::new());

        let opts = InstallOptions {
            platform: TargetPlatform::Arm,
            version: ARM_VERSION.to_string(),
            force: false,
        };
        let installer = Installer::new(&catalog, &host, opts, transport, dest_root, persist.clone());

        assert!(installer.run(&EnvMap::default()).is_err());
        assert!(!persist.env_file.exists());
    }
}

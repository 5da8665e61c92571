//! Build orchestration: compose the CMake configure + build invocation from
//! the persisted toolchain environment.
//!
//! This is a thin consumer of what the installer persisted. It validates
//! that the generator and executor binaries actually exist, optionally runs
//! the clean target, then configures and builds. It never retries.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;

use crate::core::host::HostProfile;
use crate::core::tool::Tool;
use crate::errors::SetupError;
use crate::install::env::EnvMap;
use crate::util::process::ProcessBuilder;

/// Fixed target runtime passed to the configure step.
pub const TARGET_RTOS: &str = "UCOS3";

/// Build configuration flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildType {
    Release,
    Debug,
}

impl BuildType {
    /// Lower-case name, used as the build directory name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Release => "release",
            BuildType::Debug => "debug",
        }
    }

    /// Value passed as `CMAKE_BUILD_TYPE`.
    pub fn cmake_value(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl FromStr for BuildType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "release" => Ok(BuildType::Release),
            "debug" => Ok(BuildType::Debug),
            other => Err(format!("unknown build type `{}` (expected release or debug)", other)),
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target microcontrollers the SDK can build for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McuPlatform {
    Cyt2b75M0plus,
    Cyt2b75M4,
    C2000,
}

impl McuPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            McuPlatform::Cyt2b75M0plus => "cyt2b75_m0plus",
            McuPlatform::Cyt2b75M4 => "cyt2b75_m4",
            McuPlatform::C2000 => "c2000",
        }
    }

    /// Value passed as `TARGET_PLATFORM`.
    pub fn cmake_value(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl FromStr for McuPlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cyt2b75_m0plus" => Ok(McuPlatform::Cyt2b75M0plus),
            "cyt2b75_m4" => Ok(McuPlatform::Cyt2b75M4),
            "c2000" => Ok(McuPlatform::C2000),
            other => Err(format!(
                "unknown mcu `{}` (expected cyt2b75_m0plus, cyt2b75_m4 or c2000)",
                other
            )),
        }
    }
}

impl fmt::Display for McuPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for one build invocation.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory build artifacts land under; the build type is appended.
    pub build_root: PathBuf,

    /// Target microcontroller.
    pub platform: McuPlatform,

    /// Build flavor.
    pub build_type: BuildType,

    /// Run the clean target first when the build directory exists.
    pub clean: bool,

    /// Cross-toolchain CMake file handed to the configure step.
    pub toolchain_file: PathBuf,

    /// Project source directory (`-S`).
    pub source_dir: PathBuf,
}

impl BuildOptions {
    /// The per-flavor build directory.
    pub fn build_dir(&self) -> PathBuf {
        self.build_root.join(self.build_type.as_str())
    }
}

/// The two foundational tools the orchestrator invokes.
#[derive(Debug, Clone)]
pub struct BuildTools {
    pub cmake: PathBuf,
    pub ninja: PathBuf,
}

/// Resolve the persisted CMake and Ninja paths, failing with remediation
/// text when either binary is absent.
pub fn resolve_tools(env: &EnvMap, host: &HostProfile) -> Result<BuildTools> {
    let cmake = resolve_tool(env, host, &Tool::Cmake)?;
    let ninja = resolve_tool(env, host, &Tool::Ninja)?;
    Ok(BuildTools { cmake, ninja })
}

fn resolve_tool(env: &EnvMap, host: &HostProfile, tool: &Tool) -> Result<PathBuf> {
    let missing = || SetupError::BuildToolMissing {
        tool: tool.name(),
    };

    let root = env.get(&tool.root_var()).ok_or_else(missing)?;
    let binary = tool
        .binary_path(host, Path::new(root), None)
        .ok_or_else(missing)?;

    if !binary.is_file() {
        return Err(missing().into());
    }
    Ok(binary)
}

/// Run the build: validate tools, optionally clean, configure, build.
pub fn run(opts: &BuildOptions, env: &EnvMap, host: &HostProfile) -> Result<()> {
    let tools = resolve_tools(env, host)?;
    let build_dir = opts.build_dir();

    if opts.clean && build_dir.exists() {
        clean(&tools, &build_dir)?;
    }

    configure(&tools, opts, &build_dir)?;
    compile(&tools, &build_dir)?;

    tracing::info!("build completed successfully!");
    Ok(())
}

fn clean(tools: &BuildTools, build_dir: &Path) -> Result<()> {
    tracing::info!("cleaning {}", build_dir.display());

    let cmd = ProcessBuilder::new(&tools.cmake)
        .arg("--build")
        .arg(build_dir)
        .args(["--target", "clean"]);

    run_checked(cmd)
}

fn configure(tools: &BuildTools, opts: &BuildOptions, build_dir: &Path) -> Result<()> {
    tracing::info!("configuring {} ({})", opts.platform, opts.build_type);

    let cmd = ProcessBuilder::new(&tools.cmake)
        .arg("-S")
        .arg(&opts.source_dir)
        .arg("-B")
        .arg(build_dir)
        .arg(format!(
            "-DCMAKE_TOOLCHAIN_FILE={}",
            opts.toolchain_file.display()
        ))
        .args(["-G", "Ninja"])
        .arg(format!("-DCMAKE_MAKE_PROGRAM={}", tools.ninja.display()))
        .arg(format!("-DTARGET_PLATFORM={}", opts.platform.cmake_value()))
        .arg(format!("-DTARGET_RTOS={}", TARGET_RTOS))
        .arg(format!("-DCMAKE_BUILD_TYPE={}", opts.build_type.cmake_value()));

    run_checked(cmd)
}

fn compile(tools: &BuildTools, build_dir: &Path) -> Result<()> {
    tracing::info!("building {}", build_dir.display());

    let cmd = ProcessBuilder::new(&tools.cmake).arg("--build").arg(build_dir);
    run_checked(cmd)
}

fn run_checked(cmd: ProcessBuilder) -> Result<()> {
    tracing::debug!("running `{}`", cmd.display_command());

    let status = cmd.status()?;
    if !status.success() {
        return Err(SetupError::BuildCommand {
            command: cmd.display_command(),
        }
        .into());
    }
    Ok(())
}

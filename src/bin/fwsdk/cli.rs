//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use fwsdk::build::{BuildType, McuPlatform};
use fwsdk::core::tool::TargetPlatform;

/// fwsdk - SDK toolchain installer and firmware build wrapper
#[derive(Parser)]
#[command(name = "fwsdk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install the SDK toolchain and persist its environment variables
    Setup(SetupArgs),

    /// Configure and build the firmware with the installed toolchain
    Build(BuildArgs),
}

#[derive(Args)]
pub struct SetupArgs {
    /// Target platform whose cross toolchain to install
    #[arg(short, long, default_value = "arm")]
    pub platform: TargetPlatform,

    /// ARM toolchain version (defaults to the pinned version)
    #[arg(long, conflicts_with = "c2000_version")]
    pub arm_version: Option<String>,

    /// TI C2000 toolchain version (defaults to the pinned version)
    #[arg(long, conflicts_with = "arm_version")]
    pub c2000_version: Option<String>,

    /// Reinstall everything, even tools that are already present
    #[arg(short, long)]
    pub force: bool,

    /// Path to the tool catalog (defaults to tools.toml next to the executable)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl SetupArgs {
    /// The version flag matching the selected platform; the other family's
    /// flag is inert, as `--platform` decides which toolchain is installed.
    pub fn selected_version(&self) -> Option<&str> {
        match self.platform {
            TargetPlatform::Arm => self.arm_version.as_deref(),
            TargetPlatform::C2000 => self.c2000_version.as_deref(),
        }
    }
}

#[derive(Args)]
pub struct BuildArgs {
    /// Target microcontroller
    #[arg(long)]
    pub platform: McuPlatform,

    /// Build configuration
    #[arg(long = "type")]
    pub build_type: BuildType,

    /// Directory build artifacts land under (the build type is appended)
    #[arg(long, default_value = "build")]
    pub build_dir: PathBuf,

    /// Run the clean target before building
    #[arg(long)]
    pub clean: bool,
}

//! Implementation of `fwsdk build`.

use std::path::PathBuf;

use anyhow::Result;

use fwsdk::build::{self, BuildOptions};
use fwsdk::core::host::HostProfile;
use fwsdk::install::env::EnvMap;
use fwsdk::util::logging;

use crate::cli::BuildArgs;

/// Cross-toolchain CMake file, fixed relative to the SDK source tree the
/// build runs from.
const TOOLCHAIN_FILE: &str = "cmake/arm_eabi_toolchain.cmake";

pub fn execute(args: BuildArgs, verbose: bool) -> Result<()> {
    let _guard = logging::init(verbose, None)?;

    let host = HostProfile::detect()?;
    let env = EnvMap::from_process();

    let source_dir = PathBuf::from(".");
    let opts = BuildOptions {
        build_root: args.build_dir,
        platform: args.platform,
        build_type: args.build_type,
        clean: args.clean,
        toolchain_file: source_dir.join(TOOLCHAIN_FILE),
        source_dir,
    };

    build::run(&opts, &env, &host)
}

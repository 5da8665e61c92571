//! Tool identities and their environment-variable naming.
//!
//! Each required tool maps deterministically to a root-path variable and,
//! for version-qualified tools, a version variable. The build wrapper later
//! reads the same names, so the scheme lives here and nowhere else.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::host::HostProfile;

/// Target processor families the SDK can cross-compile for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPlatform {
    Arm,
    C2000,
}

impl TargetPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetPlatform::Arm => "arm",
            TargetPlatform::C2000 => "c2000",
        }
    }

    /// Upper-cased identifier used in environment-variable names.
    pub fn var_key(&self) -> String {
        self.as_str().to_uppercase()
    }

    /// Default toolchain version installed when none is selected.
    pub fn default_version(&self) -> &'static str {
        match self {
            TargetPlatform::Arm => "gcc-arm-none-eabi-7-2018-q2-update",
            TargetPlatform::C2000 => "none",
        }
    }
}

impl FromStr for TargetPlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arm" => Ok(TargetPlatform::Arm),
            "c2000" => Ok(TargetPlatform::C2000),
            other => Err(format!("unknown platform `{}` (expected arm or c2000)", other)),
        }
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A required tool of the SDK toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// CMake, the build-file generator.
    Cmake,
    /// Ninja, the build executor.
    Ninja,
    /// OpenOCD, the hardware debug/flash utility.
    Openocd,
    /// The cross-compiler toolchain for a target platform.
    Toolchain(TargetPlatform),
}

impl Tool {
    /// Display name used in log messages.
    pub fn name(&self) -> String {
        match self {
            Tool::Cmake => "cmake".to_string(),
            Tool::Ninja => "ninja".to_string(),
            Tool::Openocd => "openocd".to_string(),
            Tool::Toolchain(p) => format!("{} toolchain", p),
        }
    }

    /// Key used in the tool catalog.
    pub fn catalog_key(&self) -> &'static str {
        match self {
            Tool::Cmake => "cmake",
            Tool::Ninja => "ninja",
            Tool::Openocd => "openocd",
            Tool::Toolchain(_) => "toolchain",
        }
    }

    /// The root-path environment variable for this tool.
    pub fn root_var(&self) -> String {
        match self {
            Tool::Cmake => "FWSDK_CMAKE_ROOT".to_string(),
            Tool::Ninja => "FWSDK_NINJA_ROOT".to_string(),
            Tool::Openocd => "FWSDK_OPENOCD_ROOT".to_string(),
            Tool::Toolchain(p) => format!("FWSDK_{}_TOOLCHAIN_ROOT", p.var_key()),
        }
    }

    /// The version environment variable, for version-qualified tools.
    pub fn version_var(&self) -> Option<String> {
        match self {
            Tool::Cmake | Tool::Ninja => None,
            Tool::Openocd => Some("FWSDK_OPENOCD_VERSION".to_string()),
            Tool::Toolchain(p) => Some(format!("FWSDK_{}_TOOLCHAIN_VERSION", p.var_key())),
        }
    }

    /// Directory under the toolchain root this tool is extracted into.
    pub fn install_subdir(&self) -> &'static str {
        match self {
            Tool::Cmake => "cmake",
            Tool::Ninja => "ninja",
            Tool::Openocd => "openocd",
            Tool::Toolchain(TargetPlatform::Arm) => "arm",
            Tool::Toolchain(TargetPlatform::C2000) => "c2000",
        }
    }

    /// Compute the path of the tool's main executable given the resolved
    /// root (and version, where qualified). Returns `None` for tools with
    /// no known probe binary.
    pub fn binary_path(
        &self,
        host: &HostProfile,
        root: &Path,
        version: Option<&str>,
    ) -> Option<PathBuf> {
        match self {
            Tool::Cmake => Some(host.binary_in(&root.join("bin"), "cmake")),
            Tool::Ninja => Some(host.binary_in(root, "ninja")),
            Tool::Openocd => {
                let version = version?;
                Some(host.binary_in(&root.join(version).join("bin"), "openocd"))
            }
            Tool::Toolchain(TargetPlatform::Arm) => {
                let version = version?;
                Some(host.binary_in(&root.join(version).join("bin"), "arm-none-eabi-gcc"))
            }
            Tool::Toolchain(TargetPlatform::C2000) => None,
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_naming() {
        assert_eq!(Tool::Cmake.root_var(), "FWSDK_CMAKE_ROOT");
        assert_eq!(Tool::Cmake.version_var(), None);
        assert_eq!(
            Tool::Openocd.version_var().unwrap(),
            "FWSDK_OPENOCD_VERSION"
        );
        assert_eq!(
            Tool::Toolchain(TargetPlatform::Arm).root_var(),
            "FWSDK_ARM_TOOLCHAIN_ROOT"
        );
        assert_eq!(
            Tool::Toolchain(TargetPlatform::C2000).version_var().unwrap(),
            "FWSDK_C2000_TOOLCHAIN_VERSION"
        );
    }

    #[test]
    fn test_binary_paths_per_os() {
        let linux = HostProfile::from_parts("linux", "x86_64").unwrap();
        let windows = HostProfile::from_parts("windows", "x86_64").unwrap();

        let cmake = Tool::Cmake
            .binary_path(&linux, Path::new("/opt/cmake"), None)
            .unwrap();
        assert_eq!(cmake, PathBuf::from("/opt/cmake/bin/cmake"));

        let ninja = Tool::Ninja
            .binary_path(&windows, Path::new("C:/tools/ninja"), None)
            .unwrap();
        assert!(ninja.ends_with("ninja.exe"));

        let gcc = Tool::Toolchain(TargetPlatform::Arm)
            .binary_path(&linux, Path::new("/opt/arm"), Some("gcc-7"))
            .unwrap();
        assert_eq!(gcc, PathBuf::from("/opt/arm/gcc-7/bin/arm-none-eabi-gcc"));
    }

    #[test]
    fn test_platform_parsing() {
        assert_eq!("arm".parse::<TargetPlatform>().unwrap(), TargetPlatform::Arm);
        assert!("avr".parse::<TargetPlatform>().is_err());
    }
}

//! fwsdk - Toolchain provisioning and cross-build wrapper for the fwsdk
//! embedded SDK.
//!
//! This crate provides the core library functionality for the `fwsdk` CLI:
//! detecting which required tools are already installed, downloading and
//! extracting platform-specific archives for anything missing, persisting
//! the resulting install paths as environment variables, and composing the
//! CMake/Ninja cross-compilation invocation from those variables.

pub mod build;
pub mod core;
pub mod errors;
pub mod install;
pub mod util;

pub use crate::core::{catalog::Catalog, host::HostProfile, tool::Tool};
pub use errors::SetupError;
pub use install::env::PendingEnvironment;

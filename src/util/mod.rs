//! Shared utilities

pub mod fs;
pub mod logging;
pub mod process;

//! Core data model: host detection, the tool catalog, and tool identities.

pub mod catalog;
pub mod host;
pub mod tool;

pub use catalog::Catalog;
pub use host::{HostOs, HostProfile};
pub use tool::{TargetPlatform, Tool};

//! Core data structures.
//!
//! - Coordinates and version ordering
//! - Soft and hard dependency names
//! - The package manifest and its sanity check
//! - The `cdep.yml` project document

pub mod coordinate;
pub mod dependency;
pub mod manifest;
pub mod project;
pub mod sanity;

pub use coordinate::{check_version, Coordinate, Version};
pub use dependency::{HardNameDependency, SoftNameDependency};
pub use manifest::Manifest;
pub use project::{BuildSystem, Project};

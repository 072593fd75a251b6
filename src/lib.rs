//! cdep - a dependency manager for prebuilt native C and C++ libraries
//!
//! This crate resolves package references to manifests, compiles each
//! manifest into a decision routine that picks one archive for a build
//! environment, and prints those routines as CMake and ndk-build glue.

pub mod core;
pub mod generator;
pub mod ir;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities for cdep unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides an in-memory manifest provider and manifest fixtures.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    coordinate::Coordinate, dependency::SoftNameDependency, manifest::Manifest, project::Project,
};

pub use ir::FunctionTable;
pub use resolver::{ResolutionScope, Resolver};
pub use util::context::GlobalContext;

//! Dependency references.
//!
//! A soft name is what a user writes: a coordinate, a manifest URL, or a
//! path to a manifest on disk. A hard name is what a manifest writes for its
//! own dependencies: a coordinate pinned to the sha256 of its manifest.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An unresolved dependency reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SoftNameDependency {
    pub compile: String,
}

impl SoftNameDependency {
    pub fn new(compile: impl Into<String>) -> Self {
        SoftNameDependency {
            compile: compile.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.compile
    }
}

impl fmt::Display for SoftNameDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compile)
    }
}

/// A dependency declared by a manifest, pinned to its manifest hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardNameDependency {
    #[serde(default)]
    pub compile: String,
    #[serde(default)]
    pub sha256: String,
}

impl HardNameDependency {
    pub fn new(compile: impl Into<String>, sha256: impl Into<String>) -> Self {
        HardNameDependency {
            compile: compile.into(),
            sha256: sha256.into(),
        }
    }

    /// The soft name this dependency resolves through.
    pub fn soft_name(&self) -> SoftNameDependency {
        SoftNameDependency::new(self.compile.clone())
    }
}

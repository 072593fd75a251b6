//! The `cdep.yml` project document.
//!
//! ```yaml
//! builders: [cmake, cmakeExamples]
//! dependencies:
//!   - compile: com.github.jomof:sqlite:3.16.2-rev45
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::dependency::SoftNameDependency;
use crate::util::error_scope::ErrorScope;

/// File name of the project document.
pub const PROJECT_FILE: &str = "cdep.yml";

/// A build system that glue code can be generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildSystem {
    #[serde(rename = "cmake")]
    Cmake,
    #[serde(rename = "cmakeExamples")]
    CmakeExamples,
    #[serde(rename = "ndk-build")]
    NdkBuild,
    #[serde(rename = "ndkBuildExamples")]
    NdkBuildExamples,
}

impl BuildSystem {
    pub const ALL: &'static [BuildSystem] = &[
        BuildSystem::Cmake,
        BuildSystem::CmakeExamples,
        BuildSystem::NdkBuild,
        BuildSystem::NdkBuildExamples,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BuildSystem::Cmake => "cmake",
            BuildSystem::CmakeExamples => "cmakeExamples",
            BuildSystem::NdkBuild => "ndk-build",
            BuildSystem::NdkBuildExamples => "ndkBuildExamples",
        }
    }
}

impl fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed `cdep.yml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub builders: Vec<BuildSystem>,
    #[serde(default)]
    pub dependencies: Vec<SoftNameDependency>,
}

impl Project {
    pub fn from_yaml_str(text: &str) -> Result<Project> {
        if text.trim().is_empty() {
            anyhow::bail!("{} was empty", PROJECT_FILE);
        }
        serde_yaml::from_str(text).with_context(|| format!("failed to parse {}", PROJECT_FILE))
    }

    /// Load `cdep.yml` from a working folder.
    pub fn load(working_folder: &Path) -> Result<Project> {
        let path = Self::path_in(working_folder);
        let text = crate::util::fs::read_to_string(&path)?;
        Self::from_yaml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn path_in(working_folder: &Path) -> PathBuf {
        working_folder.join(PROJECT_FILE)
    }

    /// Report duplicate or missing builders.
    pub fn check_sanity(&self, path: &Path, errors: &mut ErrorScope) {
        let mut seen = HashSet::new();
        for builder in &self.builders {
            errors.require(seen.insert(*builder), || {
                format!(
                    "{} 'builders' contains '{}' more than once",
                    path.display(),
                    builder
                )
            });
        }
        errors.require(!self.builders.is_empty(), || {
            let allowed: Vec<&str> = BuildSystem::ALL.iter().map(|b| b.as_str()).collect();
            format!(
                "{} 'builders' section is missing or empty. Valid values are: {}.",
                path.display(),
                allowed.join(" ")
            )
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_project() {
        let project = Project::from_yaml_str(
            "builders: [cmake, ndk-build]\ndependencies:\n  - compile: com.example:lib:1.0.0\n",
        )
        .unwrap();
        assert_eq!(project.builders, vec![BuildSystem::Cmake, BuildSystem::NdkBuild]);
        assert_eq!(project.dependencies[0].name(), "com.example:lib:1.0.0");
    }

    #[test]
    fn test_parse_example_builders() {
        let project = Project::from_yaml_str("builders: [cmakeExamples, ndkBuildExamples]\n").unwrap();
        assert_eq!(
            project.builders,
            vec![BuildSystem::CmakeExamples, BuildSystem::NdkBuildExamples]
        );
        assert_eq!(BuildSystem::NdkBuildExamples.to_string(), "ndkBuildExamples");
    }

    #[test]
    fn test_unknown_builder_fails_to_parse() {
        assert!(Project::from_yaml_str("builders: [bazel]\n").is_err());
    }

    #[test]
    fn test_empty_file() {
        let err = Project::from_yaml_str("  \n").unwrap_err();
        assert!(err.to_string().contains("was empty"));
    }

    #[test]
    fn test_sanity() {
        let project = Project {
            builders: vec![BuildSystem::Cmake, BuildSystem::Cmake],
            dependencies: vec![],
        };
        let mut errors = ErrorScope::new();
        project.check_sanity(Path::new("cdep.yml"), &mut errors);
        assert_eq!(errors.error_count(), 1);
        assert!(errors.diagnostics()[0].message.contains("more than once"));

        let mut errors = ErrorScope::new();
        Project::default().check_sanity(Path::new("cdep.yml"), &mut errors);
        assert!(errors.diagnostics()[0].message.contains("missing or empty"));
    }
}

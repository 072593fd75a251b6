//! Build-script generation.
//!
//! Each generator prints the same [`FunctionTable`] in the syntax of one
//! build system. The scripts call back into `cdep fetch-archive` at
//! configure time so archives are only downloaded for the variant a build
//! actually selects.

pub mod cmake;
pub mod examples;
pub mod ndk_build;
pub mod ndk_build_examples;
pub mod script;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::project::BuildSystem;
use crate::ir::FunctionTable;
use crate::util::fs::to_script_path;

pub use script::{Dialect, GenerateError};

/// Where generated files go and how scripts reach back to `cdep`.
#[derive(Debug, Clone)]
pub struct GeneratorEnvironment {
    pub working_folder: PathBuf,
    /// Root that archives are unpacked under.
    pub exploded_folder: PathBuf,
    pub modules_folder: PathBuf,
    pub examples_folder: PathBuf,
    /// The `cdep` executable generated scripts invoke.
    pub cdep_executable: PathBuf,
}

impl GeneratorEnvironment {
    /// Layout under `working_folder` with archives in `exploded_folder`.
    pub fn new(working_folder: &Path, exploded_folder: &Path, cdep_executable: &Path) -> Self {
        let cdep = working_folder.join(".cdep");
        Self {
            working_folder: working_folder.to_path_buf(),
            exploded_folder: exploded_folder.to_path_buf(),
            modules_folder: cdep.join("modules"),
            examples_folder: cdep.join("examples"),
            cdep_executable: cdep_executable.to_path_buf(),
        }
    }

    /// The command line that runs `cdep` with `args` against this working
    /// folder.
    pub fn callback(&self, args: &[&str]) -> Vec<String> {
        let mut command = vec![
            to_script_path(&self.cdep_executable),
            "--working-folder".to_string(),
            to_script_path(&self.working_folder),
        ];
        command.extend(args.iter().map(|arg| arg.to_string()));
        command
    }

    pub fn exploded_root(&self) -> String {
        to_script_path(&self.exploded_folder)
    }
}

/// Run the generator for each of `builders`, returning the files written.
pub fn generate(
    table: &FunctionTable,
    env: &GeneratorEnvironment,
    builders: &[BuildSystem],
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for builder in builders {
        match builder {
            BuildSystem::Cmake => written.push(cmake::write(table, env)?),
            BuildSystem::NdkBuild => written.push(ndk_build::write(table, env)?),
            BuildSystem::CmakeExamples => written.extend(examples::write(table, env)?),
            BuildSystem::NdkBuildExamples => written.extend(ndk_build_examples::write(table, env)?),
        }
    }
    Ok(written)
}

//! High-level operations.
//!
//! One module per `cdep` command. Each operation takes the
//! [`GlobalContext`] and the command's root [`ErrorScope`]; problems that
//! should not stop the command go into the scope and fatal ones are
//! returned.

pub mod fetch;
pub mod fetch_archive;
pub mod generate;
pub mod hashes;
pub mod lint;
pub mod redownload;
pub mod show;

pub use fetch::fetch;
pub use fetch_archive::fetch_archive;
pub use generate::{generate, GenerateOutcome};
pub use hashes::create_hashes;
pub use lint::lint;
pub use redownload::redownload;
pub use show::{show_folders, show_include, show_local, show_manifest, Folders};

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use crate::core::coordinate::Coordinate;
use crate::core::dependency::SoftNameDependency;
use crate::core::project::Project;
use crate::ir::{FunctionTable, FunctionTableBuilder};
use crate::resolver::{ManifestProvider, ResolutionScope, Resolver};
use crate::util::diagnostic::suggestions;
use crate::util::error_scope::ErrorScope;
use crate::util::GlobalContext;

/// A resolved dependency graph and the routines compiled from it.
pub struct Resolved {
    pub scope: ResolutionScope,
    pub table: FunctionTable,
}

/// Resolve `roots`, report what could not be resolved, and compile the
/// function table.
///
/// `locked` holds manifest hashes from a previous run; pass an empty map to
/// accept whatever the sources serve.
pub fn resolve_table(
    ctx: &GlobalContext,
    provider: &mut dyn ManifestProvider,
    roots: &[SoftNameDependency],
    locked: BTreeMap<Coordinate, String>,
    errors: &mut ErrorScope,
) -> Result<Resolved> {
    let scope = Resolver::new(provider, ctx.config().repository_urls())
        .with_locked_hashes(locked)
        .resolve_roots(roots, errors)?;
    scope.report_unresolvable(errors);
    let table = FunctionTableBuilder::from_scope(&scope).build(errors)?;
    Ok(Resolved { scope, table })
}

/// Load and sanity check `cdep.yml`.
pub fn load_project(ctx: &GlobalContext, errors: &mut ErrorScope) -> Result<Project> {
    let path = ctx.project_path();
    if !path.is_file() {
        return Err(anyhow!(
            "expected a configuration file at {}\n{}",
            path.display(),
            suggestions::NO_PROJECT
        ));
    }
    let project = Project::load(ctx.working_folder())?;
    project.check_sanity(&path, errors);
    Ok(project)
}

/// The project's dependencies. A relative path that names a file in the
/// working folder is made absolute so it resolves from anywhere.
pub fn project_roots(ctx: &GlobalContext, project: &Project) -> Vec<SoftNameDependency> {
    project
        .dependencies
        .iter()
        .map(|dependency| {
            let local = ctx.working_folder().join(dependency.name());
            if std::path::Path::new(dependency.name()).is_relative() && local.is_file() {
                SoftNameDependency::new(local.to_string_lossy())
            } else {
                dependency.clone()
            }
        })
        .collect()
}

/// Soft names from command-line arguments.
pub fn soft_names(names: &[String]) -> Vec<SoftNameDependency> {
    names.iter().map(|name| SoftNameDependency::new(name.as_str())).collect()
}

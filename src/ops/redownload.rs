//! Implementation of `cdep redownload`.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::generator;
use crate::ir::integrity::check_local_file_system_integrity;
use crate::ops::{load_project, project_roots, resolve_table};
use crate::sources::archive::{fetch_archives, referenced_archives};
use crate::sources::Environment;
use crate::util::error_scope::ErrorScope;
use crate::util::GlobalContext;

/// Fetch every manifest and archive of `cdep.yml` again, ignoring the
/// download cache, then regenerate the build glue. Returns the files written.
pub fn redownload(ctx: &GlobalContext, errors: &mut ErrorScope) -> Result<Vec<PathBuf>> {
    let project = load_project(ctx, errors)?;
    let mut env = Environment::new(ctx)?
        .force_redownload(true)
        .show_progress(!ctx.is_verbose());
    let resolved = resolve_table(
        ctx,
        &mut env,
        &project_roots(ctx, &project),
        Default::default(),
        errors,
    )?;

    let archives = referenced_archives(&resolved.table);
    info!("Redownloading {} archives", archives.len());
    fetch_archives(&mut env, &archives)?;
    check_local_file_system_integrity(&resolved.table, env.exploded_folder(), errors);

    generator::generate(&resolved.table, &ctx.generator_environment(), &project.builders)
}

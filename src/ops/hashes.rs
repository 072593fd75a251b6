//! Implementation of `cdep create hashes`.

use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::info;

use crate::ops::{load_project, project_roots, resolve_table};
use crate::sources::{Environment, ManifestHashes};
use crate::util::error_scope::ErrorScope;
use crate::util::GlobalContext;

/// Write `cdep.sha256` from scratch for the dependencies of `cdep.yml`.
/// Hashes recorded by earlier runs are ignored.
pub fn create_hashes(ctx: &GlobalContext, errors: &mut ErrorScope) -> Result<PathBuf> {
    let project = load_project(ctx, errors)?;
    let mut env = Environment::new(ctx)?;
    let resolved = resolve_table(
        ctx,
        &mut env,
        &project_roots(ctx, &project),
        Default::default(),
        errors,
    )?;

    let mut hashes = ManifestHashes::new();
    hashes.record(&resolved.scope);
    let path = ctx.hashes_path();
    if !hashes.save(&path, errors)? {
        bail!("{} was not written because of the errors above", path.display());
    }
    info!("Created {}", path.display());
    Ok(path)
}

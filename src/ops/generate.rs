//! Implementation of `cdep` / `cdep generate`.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::generator;
use crate::ops::{load_project, project_roots, resolve_table};
use crate::sources::{Environment, ManifestHashes};
use crate::util::error_scope::ErrorScope;
use crate::util::GlobalContext;

/// What a generate run produced.
#[derive(Debug, Default)]
pub struct GenerateOutcome {
    /// Build-system files written, in builder order.
    pub written: Vec<PathBuf>,
    /// Whether `cdep.sha256` was written.
    pub hashes_written: bool,
}

/// Resolve `cdep.yml`, write glue for every builder it names and record
/// manifest hashes.
///
/// Archives are not downloaded here; generated scripts fetch the variant a
/// build selects at configure time.
pub fn generate(ctx: &GlobalContext, errors: &mut ErrorScope) -> Result<GenerateOutcome> {
    let project = load_project(ctx, errors)?;
    if project.dependencies.is_empty() {
        info!("Nothing to do. Add dependencies to {}", ctx.project_path().display());
        return Ok(GenerateOutcome::default());
    }

    let hashes_path = ctx.hashes_path();
    let mut hashes = ManifestHashes::load(&hashes_path)?;
    let mut env = Environment::new(ctx)?.show_progress(!ctx.is_verbose());
    let resolved = resolve_table(
        ctx,
        &mut env,
        &project_roots(ctx, &project),
        hashes.locked(),
        errors,
    )?;

    let written = generator::generate(&resolved.table, &ctx.generator_environment(), &project.builders)?;

    hashes.record(&resolved.scope);
    let hashes_written = hashes.save(&hashes_path, errors)?;
    Ok(GenerateOutcome {
        written,
        hashes_written,
    })
}

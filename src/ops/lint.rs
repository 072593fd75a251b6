//! Implementation of `cdep lint`.

use anyhow::Result;
use tracing::info;

use crate::core::coordinate::Coordinate;
use crate::ops::{resolve_table, soft_names};
use crate::sources::Environment;
use crate::util::error_scope::ErrorScope;
use crate::util::GlobalContext;

/// Resolve each name with its dependencies and compile its routines without
/// downloading archives. Returns the coordinates that were checked.
pub fn lint(ctx: &GlobalContext, names: &[String], errors: &mut ErrorScope) -> Result<Vec<Coordinate>> {
    let mut env = Environment::new(ctx)?;
    let resolved = resolve_table(ctx, &mut env, &soft_names(names), Default::default(), errors)?;
    let checked: Vec<Coordinate> = resolved.table.order.clone();
    info!("Checked {} manifests", checked.len());
    Ok(checked)
}

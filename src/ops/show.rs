//! Implementation of `cdep show`.

use std::fmt;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use crate::core::dependency::SoftNameDependency;
use crate::ir::builder::archive_url;
use crate::ops::load_project;
use crate::resolver::{ResolvedManifest, Resolver};
use crate::sources::Environment;
use crate::util::diagnostic::suggestions;
use crate::util::error_scope::ErrorScope;
use crate::util::GlobalContext;

/// The local folders cdep reads and writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Folders {
    pub downloads: PathBuf,
    pub exploded: PathBuf,
    pub modules: PathBuf,
}

impl fmt::Display for Folders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Downloads: {}", self.downloads.display())?;
        writeln!(f, "Exploded: {}", self.exploded.display())?;
        write!(f, "Modules: {}", self.modules.display())
    }
}

pub fn show_folders(ctx: &GlobalContext) -> Folders {
    Folders {
        downloads: ctx.downloads_folder(),
        exploded: ctx.exploded_folder(),
        modules: ctx.modules_folder(),
    }
}

/// `cdep.yml` as cdep understood it.
pub fn show_manifest(ctx: &GlobalContext, errors: &mut ErrorScope) -> Result<String> {
    let project = load_project(ctx, errors)?;
    serde_yaml::to_string(&project).context("failed to render cdep.yml")
}

/// Where the header archive of `name` unpacks its include folder.
pub fn show_include(ctx: &GlobalContext, name: &str, errors: &mut ErrorScope) -> Result<PathBuf> {
    let mut env = Environment::new(ctx)?;
    let resolved = resolve_one(ctx, &mut env, name, errors)?;
    let headers = resolved
        .manifest
        .header_archive()
        .filter(|headers| !headers.file.is_empty())
        .ok_or_else(|| anyhow!("'{}' does not have a header archive", name))?;
    if headers.include.is_empty() {
        return Err(anyhow!("'{}' does not have archive.include", name));
    }
    let remote = archive_url(&resolved.remote, &headers.file)
        .with_context(|| format!("'{}' is not a valid archive name", headers.file))?;
    Ok(env
        .local_unzip_folder(resolved.coordinate(), &remote)
        .join(&headers.include))
}

/// Where the manifest of `name` is cached locally.
pub fn show_local(ctx: &GlobalContext, name: &str, errors: &mut ErrorScope) -> Result<PathBuf> {
    let mut env = Environment::new(ctx)?;
    let resolved = resolve_one(ctx, &mut env, name, errors)?;
    Ok(env.local_download_path(resolved.coordinate(), &resolved.remote))
}

fn resolve_one(
    ctx: &GlobalContext,
    env: &mut Environment,
    name: &str,
    errors: &mut ErrorScope,
) -> Result<ResolvedManifest> {
    Resolver::new(env, ctx.config().repository_urls())
        .resolve_any(&SoftNameDependency::new(name), errors)?
        .ok_or_else(|| anyhow!("could not resolve '{}'\n{}", name, suggestions::NOT_FOUND))
}

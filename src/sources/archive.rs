//! Fetch, verify and unpack the archives a function table refers to.
//!
//! Downloads run one at a time through the [`Environment`]. Verification and
//! unpacking of the downloaded files then run in parallel. An archive whose
//! size or sha256 disagrees with its manifest is deleted and never unpacked.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use rayon::prelude::*;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;
use zip::ZipArchive;

use crate::core::coordinate::Coordinate;
use crate::ir::check::archives;
use crate::ir::{FunctionTable, ModuleArchive};
use crate::resolver::ManifestProvider;
use crate::sources::environment::{url_base_name, Environment};
use crate::util::diagnostic::{suggestions, ArchiveIntegrityError, Diagnostic};
use crate::util::fs::{ensure_dir, list_files, remove_dir_all_if_exists};
use crate::util::hash::{same_digest, sha256_file};

/// Errors in the archive pipeline.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("resolved archive '{remote}' didn't exist")]
    Missing { remote: Url },

    #[error(transparent)]
    Integrity(#[from] ArchiveIntegrityError),

    #[error("don't know how to unpack '{file}'; expected a .zip or .tar.gz archive")]
    UnsupportedFormat { file: String },
}

impl ArchiveError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ArchiveError::Missing { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::FETCH_FAILED)
            }
            ArchiveError::Integrity(e) => e.to_diagnostic(),
            ArchiveError::UnsupportedFormat { .. } => Diagnostic::error(self.to_string())
                .with_suggestion("Package archives as .zip or .tar.gz"),
        }
    }
}

/// One archive to fetch, with the size and hash its manifest declares.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArchiveSpec {
    pub coordinate: Coordinate,
    pub remote: Url,
    pub size: u64,
    pub sha256: String,
}

impl ArchiveSpec {
    pub fn new(coordinate: Coordinate, remote: Url, size: u64, sha256: impl Into<String>) -> Self {
        ArchiveSpec {
            coordinate,
            remote,
            size,
            sha256: sha256.into(),
        }
    }

    pub fn from_module(coordinate: &Coordinate, archive: &ModuleArchive) -> Self {
        Self::new(coordinate.clone(), archive.remote.clone(), archive.size, &archive.sha256)
    }

    fn file_name(&self) -> String {
        url_base_name(&self.remote)
    }

    fn integrity_error(&self, property: &'static str, expected: String, actual: String) -> ArchiveError {
        ArchiveIntegrityError {
            coordinate: self.coordinate.to_string(),
            file: self.file_name(),
            property,
            expected,
            actual,
        }
        .into()
    }
}

/// Every archive named anywhere in `table`, once each.
pub fn referenced_archives(table: &FunctionTable) -> Vec<ArchiveSpec> {
    let mut specs = BTreeMap::new();
    for find in table.ordered() {
        for archive in archives(&find.body) {
            specs
                .entry(archive.remote.clone())
                .or_insert_with(|| ArchiveSpec::from_module(&find.coordinate, archive));
        }
    }
    specs.into_values().collect()
}

/// Download, verify and unpack every archive in `specs`. Returns the unpack
/// folders in the same order.
pub fn fetch_archives(env: &mut Environment, specs: &[ArchiveSpec]) -> Result<Vec<PathBuf>> {
    let mut downloaded = Vec::with_capacity(specs.len());
    for spec in specs {
        downloaded.push(download(env, spec)?);
    }

    let env: &Environment = env;
    let force_unpack = env.is_force_redownload();
    let results: Vec<Result<PathBuf>> = specs
        .par_iter()
        .zip(downloaded.par_iter())
        .map(|(spec, (local, refetched))| {
            verify(local, spec)?;
            let folder = env.local_unzip_folder(&spec.coordinate, &spec.remote);
            if force_unpack || *refetched || !folder.exists() {
                unpack(local, &folder)?;
            } else {
                debug!("{} is already unpacked", folder.display());
            }
            Ok(folder)
        })
        .collect();

    results.into_iter().collect()
}

/// Fetch a single archive. Used by the build-time callback.
pub fn fetch_archive(env: &mut Environment, spec: &ArchiveSpec) -> Result<PathBuf> {
    let mut folders = fetch_archives(env, std::slice::from_ref(spec))?;
    folders
        .pop()
        .with_context(|| format!("no folder was produced for {}", spec.remote))
}

/// Returns the local file and whether it had to be fetched again.
fn download(env: &mut Environment, spec: &ArchiveSpec) -> Result<(PathBuf, bool)> {
    let local = require_download(env, spec)?;
    if file_size(&local)? == spec.size || env.is_force_redownload() {
        return Ok((local, false));
    }
    // Most likely an interrupted download.
    info!("Size of {} is wrong; downloading it again", local.display());
    env.discard_download(&spec.coordinate, &spec.remote)?;
    Ok((require_download(env, spec)?, true))
}

fn require_download(env: &mut Environment, spec: &ArchiveSpec) -> Result<PathBuf> {
    match env.try_get_local_downloaded_file(&spec.coordinate, &spec.remote)? {
        Some(local) => Ok(local),
        None => Err(ArchiveError::Missing {
            remote: spec.remote.clone(),
        }
        .into()),
    }
}

/// Check `local` against the size and sha256 of `spec`. A file that fails
/// is removed.
pub fn verify(local: &Path, spec: &ArchiveSpec) -> Result<()> {
    let size = file_size(local)?;
    if size != spec.size {
        discard(local)?;
        return Err(spec
            .integrity_error("size", spec.size.to_string(), size.to_string())
            .into());
    }
    let sha256 = sha256_file(local)?;
    if !same_digest(&sha256, &spec.sha256) {
        discard(local)?;
        return Err(spec.integrity_error("sha256", spec.sha256.clone(), sha256).into());
    }
    Ok(())
}

fn discard(local: &Path) -> Result<()> {
    fs::remove_file(local).with_context(|| format!("failed to remove {}", local.display()))
}

fn file_size(path: &Path) -> Result<u64> {
    Ok(fs::metadata(path)
        .with_context(|| format!("failed to read {}", path.display()))?
        .len())
}

/// Unpack `archive` into `dest`, replacing what is there.
///
/// The archive is extracted next to `dest` first and moved into place, so an
/// interrupted unpack never leaves a partial folder behind.
pub fn unpack(archive: &Path, dest: &Path) -> Result<()> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(parent)?;
    let staging = TempDir::new_in(parent)
        .with_context(|| format!("failed to create staging folder in {}", parent.display()))?;

    if name.ends_with(".zip") {
        unpack_zip(archive, staging.path())?;
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        unpack_tar_gz(archive, staging.path())?;
    } else {
        return Err(ArchiveError::UnsupportedFormat { file: name }.into());
    }
    debug!("{} holds {} files", name, list_files(staging.path())?.len());

    remove_dir_all_if_exists(dest)?;
    fs::rename(staging.path(), dest)
        .with_context(|| format!("failed to move unpacked archive to {}", dest.display()))?;
    info!("Unpacked {} to {}", name, dest.display());
    Ok(())
}

fn unpack_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("failed to read zip archive {}", archive_path.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("failed to read entry {} of {}", i, archive_path.display()))?;
        let Some(relative) = entry.enclosed_name() else {
            debug!("Skipping entry outside the archive root: {}", entry.name());
            continue;
        };
        let output = dest.join(relative);

        if entry.is_dir() {
            ensure_dir(&output)?;
            continue;
        }
        if let Some(parent) = output.parent() {
            ensure_dir(parent)?;
        }
        let mut out = File::create(&output)
            .with_context(|| format!("failed to create {}", output.display()))?;
        io::copy(&mut entry, &mut out)
            .with_context(|| format!("failed to extract {}", output.display()))?;
    }
    Ok(())
}

fn unpack_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open {}", archive_path.display()))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    for entry in archive
        .entries()
        .with_context(|| format!("failed to read entries of {}", archive_path.display()))?
    {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_type = entry.header().entry_type();
        match entry_type {
            tar::EntryType::Directory
            | tar::EntryType::Regular
            | tar::EntryType::Continuous
            | tar::EntryType::Symlink
            | tar::EntryType::Link => {
                let path = entry.path().context("failed to get entry path")?.into_owned();
                if !entry
                    .unpack_in(dest)
                    .with_context(|| format!("failed to extract {}", path.display()))?
                {
                    bail!("tarball entry escapes destination directory: {}", path.display());
                }
            }
            _ => debug!("Skipping unsupported entry type {:?}", entry_type),
        }
    }
    Ok(())
}

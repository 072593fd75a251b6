//! Implementation of `cdep fetch-archive`, the callback generated build
//! scripts make at configure time.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::core::coordinate::Coordinate;
use crate::sources::archive::{self, ArchiveSpec};
use crate::sources::Environment;
use crate::util::GlobalContext;

/// Download, verify and unpack one archive. Returns the unpack folder.
pub fn fetch_archive(
    ctx: &GlobalContext,
    coordinate: &str,
    remote: &str,
    size: u64,
    sha256: &str,
) -> Result<PathBuf> {
    let coordinate = Coordinate::try_parse(coordinate)
        .ok_or_else(|| anyhow!("'{}' is not a group:artifact:version coordinate", coordinate))?;
    let remote = Url::parse(remote).with_context(|| format!("'{}' is not a URL", remote))?;

    let mut env = Environment::new(ctx)?;
    archive::fetch_archive(&mut env, &ArchiveSpec::new(coordinate, remote, size, sha256))
}

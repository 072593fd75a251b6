//! The boundary between resolution and the outside world.

use std::path::PathBuf;

use anyhow::Result;
use url::Url;

use crate::core::coordinate::Coordinate;
use crate::core::manifest::Manifest;

/// A manifest as it was fetched, with the hash of its exact text.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedManifest {
    pub manifest: Manifest,
    pub sha256: String,
}

/// A manifest accepted by a resolver, keyed by where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedManifest {
    pub remote: Url,
    pub manifest: Manifest,
    pub sha256: String,
}

impl ResolvedManifest {
    pub fn new(remote: Url, fetched: FetchedManifest) -> Self {
        ResolvedManifest {
            remote,
            manifest: fetched.manifest,
            sha256: fetched.sha256,
        }
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.manifest.coordinate
    }
}

/// Fetches manifests and archives.
///
/// `Ok(None)` means the thing does not exist at that URL. Content that was
/// fetched but could not be parsed is an error.
pub trait ManifestProvider {
    /// Fetch and parse the manifest at `url`. `coordinate` is what the caller
    /// expects to find there and decides where it is cached.
    fn try_get_manifest(
        &mut self,
        coordinate: &Coordinate,
        url: &Url,
    ) -> Result<Option<FetchedManifest>>;

    /// Make a local copy of the file at `url`, returning its path.
    fn try_get_local_downloaded_file(
        &mut self,
        coordinate: &Coordinate,
        url: &Url,
    ) -> Result<Option<PathBuf>>;
}

//! Test utilities for cdep unit tests.
//!
//! [`InMemoryProvider`] stands in for the network and the download cache so
//! resolver tests can describe the world as a map of URL to manifest text.
//!
//! # Example
//!
//! ```rust,ignore
//! use cdep::test_support::{fixtures::manifest_yaml, InMemoryProvider};
//!
//! let mut provider = InMemoryProvider::new();
//! provider.add(
//!     "https://repo.example.com/cdep/com/example/lib/1.0.0/cdep-manifest.yml",
//!     &manifest_yaml("com.example:lib:1.0.0", &[]),
//! );
//! ```

pub mod fixtures;
pub mod scripts;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tempfile::TempDir;
use url::Url;

use crate::core::coordinate::Coordinate;
use crate::core::manifest::Manifest;
use crate::resolver::{FetchedManifest, ManifestProvider};
use crate::util::hash::sha256_str;

/// A [`ManifestProvider`] backed by maps, recording every request.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    manifests: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
    requests: Vec<String>,
    downloads: Option<TempDir>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `text` as the manifest at `url`.
    pub fn add(&mut self, url: &str, text: &str) {
        self.manifests.insert(url.to_string(), text.to_string());
    }

    /// Serve `content` as a downloadable file at `url`.
    pub fn add_file(&mut self, url: &str, content: impl Into<Vec<u8>>) {
        self.files.insert(url.to_string(), content.into());
    }

    /// Every URL asked for, in order.
    pub fn requests(&self) -> &[String] {
        &self.requests
    }
}

impl ManifestProvider for InMemoryProvider {
    fn try_get_manifest(
        &mut self,
        _coordinate: &Coordinate,
        url: &Url,
    ) -> Result<Option<FetchedManifest>> {
        self.requests.push(url.to_string());
        let Some(text) = self.manifests.get(url.as_str()) else {
            return Ok(None);
        };
        let manifest = Manifest::from_yaml_str(text)
            .with_context(|| format!("failed to parse manifest at {}", url))?;
        Ok(Some(FetchedManifest {
            manifest,
            sha256: sha256_str(text),
        }))
    }

    fn try_get_local_downloaded_file(
        &mut self,
        _coordinate: &Coordinate,
        url: &Url,
    ) -> Result<Option<PathBuf>> {
        self.requests.push(url.to_string());
        let Some(content) = self.files.get(url.as_str()) else {
            return Ok(None);
        };
        if self.downloads.is_none() {
            self.downloads = Some(TempDir::new().context("failed to create download folder")?);
        }
        let Some(downloads) = &self.downloads else {
            return Ok(None);
        };
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .unwrap_or("download");
        let path = downloads.path().join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url_is_none_and_recorded() {
        let mut provider = InMemoryProvider::new();
        let coordinate = Coordinate::new("g", "a", "1.0.0");
        let url = Url::parse("https://example.com/cdep-manifest.yml").unwrap();
        assert!(provider.try_get_manifest(&coordinate, &url).unwrap().is_none());
        assert_eq!(provider.requests(), ["https://example.com/cdep-manifest.yml"]);
    }

    #[test]
    fn test_files_are_materialized() {
        let mut provider = InMemoryProvider::new();
        provider.add_file("https://example.com/lib.zip", b"PK".to_vec());
        let coordinate = Coordinate::new("g", "a", "1.0.0");
        let url = Url::parse("https://example.com/lib.zip").unwrap();
        let path = provider
            .try_get_local_downloaded_file(&coordinate, &url)
            .unwrap()
            .unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"PK");
    }
}

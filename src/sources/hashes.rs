//! The `cdep.sha256` pin file.
//!
//! Records the manifest hash of every coordinate a successful run resolved.
//! The next run refuses a manifest whose text changed under the same
//! coordinate.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::coordinate::Coordinate;
use crate::resolver::ResolutionScope;
use crate::util::error_scope::ErrorScope;
use crate::util::fs::{read_to_string, write_string};

const HEADER: &str = "\
# This file is automatically maintained by CDep.
#
#     MANUAL EDITS WILL BE LOST ON THE NEXT CDEP RUN
#
# This file contains a list of CDep coordinates along with the SHA256 hash of their
# manifest file. This is to ensure that a manifest hasn't changed since the last
# time CDep ran.
# The recommended best practice is to check this file into source control so that
# anyone else who builds this project is guaranteed to get the same dependencies.

";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct HashEntry {
    coordinate: String,
    sha256: String,
}

/// Manifest hashes keyed by coordinate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestHashes {
    entries: BTreeMap<String, String>,
}

impl ManifestHashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `path`. A missing file has no hashes.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = read_to_string(path)?;
        Self::from_yaml_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let has_content = text
            .lines()
            .map(str::trim)
            .any(|line| !line.is_empty() && !line.starts_with('#'));
        if !has_content {
            return Ok(Self::default());
        }
        let list: Option<Vec<HashEntry>> = serde_yaml::from_str(text)?;
        let entries = list
            .unwrap_or_default()
            .into_iter()
            .map(|entry| (entry.coordinate, entry.sha256))
            .collect();
        Ok(ManifestHashes { entries })
    }

    /// The file text: a warning header followed by the YAML list.
    pub fn to_file_string(&self) -> Result<String> {
        let list: Vec<HashEntry> = self
            .entries
            .iter()
            .map(|(coordinate, sha256)| HashEntry {
                coordinate: coordinate.clone(),
                sha256: sha256.clone(),
            })
            .collect();
        let yaml = serde_yaml::to_string(&list)?;
        Ok(format!("{}{}", HEADER, yaml.trim_start_matches("---\n")))
    }

    /// Write `path` unless `errors` holds an error, in which case the hashes
    /// may be wrong and the file is left alone. Returns whether it was written.
    pub fn save(&self, path: &Path, errors: &ErrorScope) -> Result<bool> {
        if !errors.is_empty() {
            tracing::debug!("Not writing {} because of earlier errors", path.display());
            return Ok(false);
        }
        write_string(path, &self.to_file_string()?)?;
        Ok(true)
    }

    pub fn insert(&mut self, coordinate: &Coordinate, sha256: impl Into<String>) {
        self.entries.insert(coordinate.to_string(), sha256.into());
    }

    pub fn get(&self, coordinate: &Coordinate) -> Option<&str> {
        self.entries.get(&coordinate.to_string()).map(String::as_str)
    }

    /// Record the hash of every manifest active in `scope`.
    pub fn record(&mut self, scope: &ResolutionScope) {
        for resolved in scope.active_manifests() {
            if !resolved.coordinate().is_blank() {
                self.insert(resolved.coordinate(), &resolved.sha256);
            }
        }
    }

    /// Hashes a resolver must hold manifests to. Entries whose key is not a
    /// coordinate are dropped.
    pub fn locked(&self) -> BTreeMap<Coordinate, String> {
        self.entries
            .iter()
            .filter_map(|(coordinate, sha256)| {
                Coordinate::try_parse(coordinate).map(|c| (c, sha256.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, s)| (c.as_str(), s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cdep.sha256");
        let mut hashes = ManifestHashes::new();
        hashes.insert(&Coordinate::new("com.example", "lib", "1.0.0"), "aa11");
        hashes.insert(&Coordinate::new("com.example", "app", "2.0.0"), "bb22");

        assert!(hashes.save(&path, &ErrorScope::new()).unwrap());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# This file is automatically maintained by CDep."));
        assert!(text.contains("com.example:app:2.0.0"));

        let loaded = ManifestHashes::load(&path).unwrap();
        assert_eq!(loaded, hashes);
        assert_eq!(
            loaded.get(&Coordinate::new("com.example", "lib", "1.0.0")),
            Some("aa11")
        );
    }

    #[test]
    fn test_not_written_with_errors_in_scope() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cdep.sha256");
        let mut errors = ErrorScope::new();
        errors.fail("archive was malformed");
        assert!(!ManifestHashes::new().save(&path, &errors).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_and_comment_only_files_are_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(ManifestHashes::load(&tmp.path().join("absent")).unwrap().is_empty());
        assert!(ManifestHashes::from_yaml_str(HEADER).unwrap().is_empty());
    }

    #[test]
    fn test_locked_skips_non_coordinates() {
        let hashes = ManifestHashes::from_yaml_str(
            "- coordinate: com.example:lib:1.0.0\n  sha256: aa\n- coordinate: junk\n  sha256: bb\n",
        )
        .unwrap();
        assert_eq!(hashes.len(), 2);
        let locked = hashes.locked();
        assert_eq!(locked.len(), 1);
        assert_eq!(locked[&Coordinate::new("com.example", "lib", "1.0.0")], "aa");
    }
}

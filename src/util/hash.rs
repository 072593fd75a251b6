//! SHA256 helpers for manifest pins and archive verification.

use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Lowercase hex digest of `data`.
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Digest of a manifest's text, the value `cdep.sha256` pins.
pub fn sha256_str(text: &str) -> String {
    sha256_bytes(text.as_bytes())
}

/// Digest of a downloaded file, streamed so large archives stay out of memory.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Compare two hex digests, ignoring case.
pub fn same_digest(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_str() {
        assert_eq!(
            sha256_str("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_sha256_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.txt");
        std::fs::write(&path, "hello").unwrap();

        assert_eq!(sha256_file(&path).unwrap(), sha256_str("hello"));
    }

    #[test]
    fn test_same_digest_ignores_case() {
        assert!(same_digest("ABCDEF", "abcdef"));
        assert!(!same_digest("abcdef", "abcdee"));
    }
}

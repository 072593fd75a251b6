//! Where manifests and archives come from.
//!
//! [`Environment`] owns the download cache and implements
//! [`ManifestProvider`](crate::resolver::ManifestProvider). The archive
//! pipeline and the `cdep.sha256` pin file build on it.

pub mod archive;
pub mod environment;
pub mod hashes;

pub use archive::{ArchiveError, ArchiveSpec};
pub use environment::Environment;
pub use hashes::ManifestHashes;

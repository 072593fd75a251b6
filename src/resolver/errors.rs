//! Resolution error types and diagnostics.

use std::fmt;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, AmbiguousResolutionError, Diagnostic};

/// Why a name could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Unresolvable {
    /// The name is not a coordinate, URL, or manifest path.
    Unparseable,
    /// The name is well formed but no resolver produced a manifest.
    DidntExist,
}

impl fmt::Display for Unresolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unresolvable::Unparseable => write!(f, "UNPARSEABLE"),
            Unresolvable::DidntExist => write!(f, "DIDNT_EXIST"),
        }
    }
}

/// Error during dependency resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{} dependencies could not be resolved", .entries.len())]
    Unresolved {
        entries: Vec<(String, Unresolvable)>,
    },

    #[error(transparent)]
    Ambiguous(#[from] AmbiguousResolutionError),

    #[error("coordinate `{coordinate}` was resolved more than once")]
    AlreadyResolved { coordinate: String },

    #[error("{field} '{manifest_value}' from manifest did not agree with '{url_value}' from {url}")]
    ManifestMismatch {
        field: &'static str,
        manifest_value: String,
        url_value: String,
        url: String,
    },

    #[error("manifest hash mismatch for `{coordinate}`")]
    HashMismatch {
        coordinate: String,
        expected: String,
        actual: String,
        pinned_by: String,
    },

    #[error("manifest {source_name} has no coordinate")]
    MissingCoordinate { source_name: String },

    #[error("could not parse manifest {source_name}: {message}")]
    MalformedManifest { source_name: String, message: String },

    #[error("source error for `{name}`: {message}")]
    Provider { name: String, message: String },
}

impl ResolveError {
    /// Wrap a provider failure for `name`.
    pub fn provider(name: impl Into<String>, error: anyhow::Error) -> Self {
        ResolveError::Provider {
            name: name.into(),
            message: format!("{:#}", error),
        }
    }

    /// Whether this error ends the run immediately rather than being batched.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ResolveError::Unresolved { .. })
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::Unresolved { entries } => {
                let mut diag = Diagnostic::error(self.to_string());
                for (name, reason) in entries {
                    diag = diag.with_context(unresolvable_message(name, *reason));
                }
                diag.with_suggestion(suggestions::NOT_FOUND)
            }

            ResolveError::Ambiguous(ambiguous) => Diagnostic::error(self.to_string())
                .with_context(format!(
                    "`{}` matched: {}",
                    ambiguous.name,
                    ambiguous.resolvers.join(", ")
                ))
                .with_suggestion("Use a full manifest URL to pick one source"),

            ResolveError::AlreadyResolved { .. } => Diagnostic::error(self.to_string())
                .with_context("this is an internal invariant violation"),

            ResolveError::ManifestMismatch { url, .. } => Diagnostic::error(self.to_string())
                .with_context(format!("manifest fetched from {}", url))
                .with_suggestion("The release was published with a manifest for another package"),

            ResolveError::HashMismatch {
                expected,
                actual,
                pinned_by,
                ..
            } => Diagnostic::error(self.to_string())
                .with_context(format!("expected: {}", expected))
                .with_context(format!("actual:   {}", actual))
                .with_context(format!("pinned by {}", pinned_by))
                .with_suggestion(suggestions::STALE_HASHES),

            ResolveError::MissingCoordinate { .. } | ResolveError::MalformedManifest { .. } => {
                Diagnostic::error(self.to_string())
            }

            ResolveError::Provider { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::FETCH_FAILED)
            }
        }
    }
}

/// The user-facing line for one unresolvable name.
pub fn unresolvable_message(name: &str, reason: Unresolvable) -> String {
    match reason {
        Unresolvable::DidntExist => format!("Could not resolve '{}'. It doesn't exist.", name),
        Unresolvable::Unparseable => format!(
            "Could not resolve '{}'. It didn't look like a coordinate.",
            name
        ),
    }
}

//! User-facing diagnostic messages.
//!
//! Every problem reported to the user carries the root cause, the context it
//! was found in, and where possible a concrete next step.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no cdep.yml is found.
    pub const NO_PROJECT: &str =
        "help: Create a cdep.yml with `builders` and `dependencies` sections";

    /// Suggestion when a coordinate could not be found.
    pub const NOT_FOUND: &str =
        "help: Check the coordinate spelling, or point at a cdep-manifest.yml directly";

    /// Suggestion when a pinned manifest hash changed.
    pub const STALE_HASHES: &str =
        "help: If the change is expected, delete cdep.sha256 and run `cdep create hashes`";

    /// Suggestion for fetch failures.
    pub const FETCH_FAILED: &str = "help: Check your network connection and try `cdep redownload`";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    fn new(message: impl Into<String>, severity: Severity) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Warning)
    }

    /// Create a new note.
    pub fn note(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Note)
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self) -> String {
        let mut output = format!("{}: {}\n", self.severity, self.message);

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push_str("\nhelp: consider:\n");
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic) {
    eprint!("{}", diagnostic.format());
}

/// Print every diagnostic followed by a one-line summary of the error count.
pub fn emit_all(diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        emit(diag);
    }
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    if errors > 0 {
        eprintln!("{} error{} found", errors, if errors == 1 { "" } else { "s" });
    }
}

/// More than one resolver accepted the same name.
#[derive(Debug, Clone, PartialEq, Error, MietteDiagnostic)]
#[error("multiple resolvers matched coordinate: {name}")]
#[diagnostic(
    code(cdep::resolve::ambiguous),
    help("Use a full manifest URL to pick one source")
)]
pub struct AmbiguousResolutionError {
    pub name: String,
    pub resolvers: Vec<&'static str>,
}

/// A downloaded archive does not match what its manifest declares.
#[derive(Debug, Clone, PartialEq, Error, MietteDiagnostic)]
#[error("{property} of {file} does not match the manifest of `{coordinate}`")]
#[diagnostic(
    code(cdep::archive::integrity),
    help("The downloaded file was removed. Run `cdep redownload` to fetch it again")
)]
pub struct ArchiveIntegrityError {
    pub coordinate: String,
    pub file: String,
    /// `size` or `sha256`.
    pub property: &'static str,
    pub expected: String,
    pub actual: String,
}

impl ArchiveIntegrityError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string())
            .with_context(format!("expected: {}", self.expected))
            .with_context(format!("actual:   {}", self.actual))
            .with_suggestion(suggestions::FETCH_FAILED)
    }
}

//! Per-command accumulation of non-fatal problems.
//!
//! A command creates one root [`ErrorScope`] at entry. Work that wants to
//! judge its own problems in isolation (for example linting a single
//! manifest) takes a [`ErrorScope::child`], and folds it back with
//! [`ErrorScope::merge`], which hands back what the child collected.
//! The command exits non-zero iff the root scope ends non-empty.

use crate::util::diagnostic::{Diagnostic, Severity};

/// Collector of non-fatal diagnostics.
#[derive(Debug, Default)]
pub struct ErrorScope {
    diagnostics: Vec<Diagnostic>,
    label: Option<String>,
}

impl ErrorScope {
    /// Create an empty root scope.
    pub fn new() -> Self {
        ErrorScope::default()
    }

    /// Create an empty child scope. Diagnostics reported into the child do
    /// not reach this scope until [`merge`](Self::merge) is called.
    pub fn child(&self, label: impl Into<String>) -> ErrorScope {
        ErrorScope {
            diagnostics: Vec::new(),
            label: Some(label.into()),
        }
    }

    /// Fold a child scope into this one and return the child's diagnostics.
    pub fn merge(&mut self, child: ErrorScope) -> Vec<Diagnostic> {
        let collected = child.diagnostics;
        for diag in &collected {
            let diag = match &child.label {
                Some(label) => diag.clone().with_context(format!("while {}", label)),
                None => diag.clone(),
            };
            self.diagnostics.push(diag);
        }
        collected
    }

    /// Record a diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        tracing::debug!("{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    /// Record an error message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.report(Diagnostic::error(message));
    }

    /// Record `message` when `condition` is false. Returns `condition`.
    pub fn require(&mut self, condition: bool, message: impl FnOnce() -> String) -> bool {
        if !condition {
            self.fail(message());
        }
        condition
    }

    /// Record `message` when `condition` is true. Returns `condition`.
    pub fn fail_if(&mut self, condition: bool, message: impl FnOnce() -> String) -> bool {
        if condition {
            self.fail(message());
        }
        condition
    }

    /// Number of errors (warnings are not counted).
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Whether no error has been recorded.
    pub fn is_empty(&self) -> bool {
        self.error_count() == 0
    }

    /// All recorded diagnostics, in report order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the scope.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_and_fail_if() {
        let mut scope = ErrorScope::new();
        assert!(scope.require(true, || "unreachable".into()));
        assert!(!scope.require(false, || "first".into()));
        assert!(scope.fail_if(true, || "second".into()));
        assert_eq!(scope.error_count(), 2);
        assert_eq!(scope.diagnostics()[0].message, "first");
    }

    #[test]
    fn test_child_is_isolated_until_merged() {
        let mut root = ErrorScope::new();
        let mut child = root.child("linting lib");
        child.fail("bad archive");
        assert!(root.is_empty());

        let collected = root.merge(child);
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].message, "bad archive");
        assert_eq!(root.error_count(), 1);
        assert_eq!(root.diagnostics()[0].context, vec!["while linting lib"]);
    }

    #[test]
    fn test_warnings_do_not_count() {
        let mut scope = ErrorScope::new();
        scope.report(Diagnostic::warning("just a warning"));
        assert!(scope.is_empty());
        assert_eq!(scope.diagnostics().len(), 1);
    }
}

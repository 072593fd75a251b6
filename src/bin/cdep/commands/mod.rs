//! Command implementations

pub mod completions;
pub mod create;
pub mod fetch;
pub mod fetch_archive;
pub mod generate;
pub mod lint;
pub mod redownload;
pub mod show;

use anyhow::{bail, Result};

use cdep::util::diagnostic::emit_all;
use cdep::util::ErrorScope;

/// Print what `errors` collected, then fail the command if the operation
/// failed or any error was collected.
pub fn finish<T>(errors: ErrorScope, result: Result<T>) -> Result<T> {
    let error_count = errors.error_count();
    let diagnostics = errors.into_diagnostics();
    if !diagnostics.is_empty() {
        emit_all(&diagnostics);
    }
    let value = result?;
    if error_count > 0 {
        bail!("could not finish because of previous error{}", if error_count == 1 { "" } else { "s" });
    }
    Ok(value)
}

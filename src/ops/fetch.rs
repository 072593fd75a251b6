//! Implementation of `cdep fetch`.

use anyhow::Result;
use tracing::info;

use crate::ir::integrity::check_local_file_system_integrity;
use crate::ops::{resolve_table, soft_names};
use crate::sources::archive::{fetch_archives, referenced_archives};
use crate::sources::Environment;
use crate::util::error_scope::ErrorScope;
use crate::util::GlobalContext;

/// Download and unpack every archive of each named package and its
/// dependencies. Recorded manifest hashes are not consulted.
pub fn fetch(ctx: &GlobalContext, names: &[String], errors: &mut ErrorScope) -> Result<()> {
    let mut env = Environment::new(ctx)?.show_progress(!ctx.is_verbose());
    for root in soft_names(names) {
        let mut child = errors.child(format!("fetching {}", root));
        let resolved = resolve_table(ctx, &mut env, std::slice::from_ref(&root), Default::default(), &mut child)?;
        fetch_archives(&mut env, &referenced_archives(&resolved.table))?;
        check_local_file_system_integrity(&resolved.table, env.exploded_folder(), &mut child);
        errors.merge(child);
    }
    info!("Fetch complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures;
    use tempfile::TempDir;

    #[test]
    fn test_fetch_unpacks_local_package() {
        let tmp = TempDir::new().unwrap();
        let manifest = fixtures::write_local_package(&tmp.path().join("pkg"));
        let ctx = GlobalContext::with_home(tmp.path().join("work"), tmp.path().join("home"), None);

        let mut errors = ErrorScope::new();
        fetch(&ctx, &[manifest.to_string_lossy().into_owned()], &mut errors).unwrap();
        assert!(errors.is_empty(), "{:?}", errors.diagnostics());
        let folder = ctx.exploded_folder().join("com.example/lib/1.0.0/lib-arm64-v8a.zip");
        assert!(folder.join("include/lib.h").is_file());
        assert!(folder.join("lib/arm64-v8a/liblib.a").is_file());
    }

    #[test]
    fn test_unresolvable_name_is_reported() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_home(tmp.path().join("work"), tmp.path().join("home"), None);
        let mut errors = ErrorScope::new();
        fetch(&ctx, &["not-a-coordinate".to_string()], &mut errors).unwrap();
        assert_eq!(errors.error_count(), 1);
    }
}

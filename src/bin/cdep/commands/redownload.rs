//! `cdep redownload` command

use anyhow::Result;

use cdep::ops;
use cdep::util::{ErrorScope, GlobalContext};

use super::finish;

pub fn execute(ctx: &GlobalContext) -> Result<()> {
    let mut errors = ErrorScope::new();
    let result = ops::redownload(ctx, &mut errors);
    let written = finish(errors, result)?;

    for path in &written {
        eprintln!("   Generated {}", path.display());
    }
    Ok(())
}

//! `cdep generate` command, also run when no command is given

use anyhow::Result;

use cdep::ops;
use cdep::util::{ErrorScope, GlobalContext};

use super::finish;

pub fn execute(ctx: &GlobalContext) -> Result<()> {
    let mut errors = ErrorScope::new();
    let result = ops::generate(ctx, &mut errors);
    let outcome = finish(errors, result)?;

    for path in &outcome.written {
        eprintln!("   Generated {}", path.display());
    }
    if outcome.hashes_written {
        eprintln!("     Updated {}", ctx.hashes_path().display());
    }
    Ok(())
}

//! `cdep lint` command

use anyhow::Result;

use cdep::ops;
use cdep::util::{ErrorScope, GlobalContext};

use super::finish;
use crate::cli::LintArgs;

pub fn execute(ctx: &GlobalContext, args: LintArgs) -> Result<()> {
    let mut errors = ErrorScope::new();
    let result = ops::lint(ctx, &args.names, &mut errors);
    let checked = finish(errors, result)?;

    eprintln!("     Checked {} package{}", checked.len(), if checked.len() == 1 { "" } else { "s" });
    Ok(())
}

//! `cdep create` command

use anyhow::Result;

use cdep::ops;
use cdep::util::{ErrorScope, GlobalContext};

use super::finish;
use crate::cli::{CreateArgs, CreateCommands};

pub fn execute(ctx: &GlobalContext, args: CreateArgs) -> Result<()> {
    match args.command {
        CreateCommands::Hashes => {
            let mut errors = ErrorScope::new();
            let result = ops::create_hashes(ctx, &mut errors);
            let path = finish(errors, result)?;
            eprintln!("     Created {}", path.display());
        }
    }
    Ok(())
}

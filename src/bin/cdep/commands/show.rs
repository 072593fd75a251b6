//! `cdep show` command

use anyhow::Result;

use cdep::ops;
use cdep::util::{ErrorScope, GlobalContext};

use super::finish;
use crate::cli::{ShowArgs, ShowCommands};

pub fn execute(ctx: &GlobalContext, args: ShowArgs) -> Result<()> {
    let mut errors = ErrorScope::new();
    match args.command {
        ShowCommands::Folders => {
            println!("{}", ops::show_folders(ctx));
        }
        ShowCommands::Manifest => {
            let result = ops::show_manifest(ctx, &mut errors);
            print!("{}", finish(errors, result)?);
        }
        ShowCommands::Include(include) => {
            let mut folders = Vec::new();
            for coordinate in &include.coordinates {
                folders.push(ops::show_include(ctx, coordinate, &mut errors));
            }
            let result: Result<Vec<_>> = folders.into_iter().collect();
            for folder in finish(errors, result)? {
                println!("{}", folder.display());
            }
        }
        ShowCommands::Local(local) => {
            let result = ops::show_local(ctx, &local.coordinate, &mut errors);
            println!("{}", finish(errors, result)?.display());
        }
    }
    Ok(())
}

//! `cdep fetch` command

use anyhow::Result;

use cdep::ops;
use cdep::util::{ErrorScope, GlobalContext};

use super::finish;
use crate::cli::FetchArgs;

pub fn execute(ctx: &GlobalContext, args: FetchArgs) -> Result<()> {
    let mut errors = ErrorScope::new();
    let result = ops::fetch(ctx, &args.names, &mut errors);
    finish(errors, result)
}

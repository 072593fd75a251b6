//! `cdep fetch-archive` command
//!
//! Called by generated CMake and ndk-build scripts when a build selects an
//! archive that is not unpacked yet.

use anyhow::Result;

use cdep::ops;
use cdep::util::GlobalContext;

use crate::cli::FetchArchiveArgs;

pub fn execute(ctx: &GlobalContext, args: FetchArchiveArgs) -> Result<()> {
    let folder = ops::fetch_archive(ctx, &args.coordinate, &args.url, args.size, &args.sha256)?;
    println!("{}", folder.display());
    Ok(())
}

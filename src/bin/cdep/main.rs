//! cdep CLI - dependency manager for prebuilt native C and C++ libraries

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cdep::generator::script::GenerateError;
use cdep::ir::builder::BuildError;
use cdep::resolver::ResolveError;
use cdep::sources::ArchiveError;
use cdep::util::diagnostic::emit;
use cdep::util::GlobalContext;
use cli::{normalize_args, Cli, Commands};

fn main() {
    if let Err(e) = run() {
        report(&e);
        std::process::exit(1);
    }
}

/// Errors that know how to describe themselves get a full diagnostic.
fn report(e: &anyhow::Error) {
    let diagnostic = if let Some(err) = e.downcast_ref::<ResolveError>() {
        Some(err.to_diagnostic())
    } else if let Some(err) = e.downcast_ref::<BuildError>() {
        Some(err.to_diagnostic())
    } else if let Some(err) = e.downcast_ref::<ArchiveError>() {
        Some(err.to_diagnostic())
    } else {
        e.downcast_ref::<GenerateError>().map(GenerateError::to_diagnostic)
    };
    match diagnostic {
        Some(diagnostic) => emit(&diagnostic),
        None => eprintln!("error: {:#}", e),
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("cdep=debug")
    } else {
        EnvFilter::new("cdep=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let command = match cli.command {
        Some(Commands::Completions(args)) => return commands::completions::execute(args),
        Some(command) => command,
        None => Commands::Generate,
    };

    let mut ctx = GlobalContext::new(cli.working_folder.as_deref(), cli.download_folder.as_deref())?;
    ctx.set_verbose(cli.verbose);

    // Execute command
    match command {
        Commands::Generate => commands::generate::execute(&ctx),
        Commands::Redownload => commands::redownload::execute(&ctx),
        Commands::Fetch(args) => commands::fetch::execute(&ctx, args),
        Commands::FetchArchive(args) => commands::fetch_archive::execute(&ctx, args),
        Commands::Lint(args) => commands::lint::execute(&ctx, args),
        Commands::Create(args) => commands::create::execute(&ctx, args),
        Commands::Show(args) => commands::show::execute(&ctx, args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

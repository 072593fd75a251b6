//! CLI definitions using clap.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// cdep - a dependency manager for prebuilt native C and C++ libraries
#[derive(Parser)]
#[command(name = "cdep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Folder holding cdep.yml (also accepted as -wf)
    #[arg(long, global = true, value_name = "DIR")]
    pub working_folder: Option<PathBuf>,

    /// Folder for downloads and unpacked archives (also accepted as -df)
    #[arg(long, global = true, value_name = "DIR")]
    pub download_folder: Option<PathBuf>,

    /// Defaults to `generate`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write build-system glue for the dependencies in cdep.yml
    Generate,

    /// Download every referenced archive again, then generate
    Redownload,

    /// Download and check the archives of the given packages
    Fetch(FetchArgs),

    /// Download, verify and unpack a single archive
    #[command(name = "fetch-archive")]
    FetchArchive(FetchArchiveArgs),

    /// Resolve and check packages without writing anything
    Lint(LintArgs),

    /// Create project files
    Create(CreateArgs),

    /// Show folders, the project configuration, or package files
    Show(ShowArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct FetchArgs {
    /// Coordinates, manifest URLs or manifest paths
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[derive(Args)]
pub struct FetchArchiveArgs {
    /// Coordinate of the package the archive belongs to
    pub coordinate: String,

    /// Archive URL
    pub url: String,

    /// Expected size in bytes
    pub size: u64,

    /// Expected SHA-256, hex encoded
    pub sha256: String,
}

#[derive(Args)]
pub struct LintArgs {
    /// Coordinates, manifest URLs or manifest paths
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[derive(Args)]
pub struct CreateArgs {
    #[command(subcommand)]
    pub command: CreateCommands,
}

#[derive(Subcommand)]
pub enum CreateCommands {
    /// Write cdep.sha256 for the dependencies in cdep.yml
    Hashes,
}

#[derive(Args)]
pub struct ShowArgs {
    #[command(subcommand)]
    pub command: ShowCommands,
}

#[derive(Subcommand)]
pub enum ShowCommands {
    /// Print the download, exploded and modules folders
    Folders,

    /// Print cdep.yml as cdep understood it
    Manifest,

    /// Print the unpacked include folder of each package
    Include(ShowIncludeArgs),

    /// Print where a downloaded manifest is cached
    Local(ShowLocalArgs),
}

#[derive(Args)]
pub struct ShowIncludeArgs {
    #[arg(required = true)]
    pub coordinates: Vec<String>,
}

#[derive(Args)]
pub struct ShowLocalArgs {
    pub coordinate: String,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Rewrite the two-letter `-wf` and `-df` flags, which clap cannot express
/// as shorts, to their long forms.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-wf") => OsString::from("--working-folder"),
            Some("-df") => OsString::from("--download-folder"),
            _ => arg,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(normalize_args(args.iter().map(OsString::from)))
    }

    #[test]
    fn test_short_folder_flags() {
        let cli = parse(&["cdep", "-wf", "/work", "-df", "/cache", "show", "folders"]);
        assert_eq!(cli.working_folder, Some(PathBuf::from("/work")));
        assert_eq!(cli.download_folder, Some(PathBuf::from("/cache")));
        assert!(matches!(
            cli.command,
            Some(Commands::Show(ShowArgs {
                command: ShowCommands::Folders
            }))
        ));
    }

    #[test]
    fn test_no_command_means_generate() {
        let cli = parse(&["cdep", "--working-folder", "/work"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_fetch_archive_arguments() {
        let cli = parse(&[
            "cdep",
            "fetch-archive",
            "com.example:lib:1.0.0",
            "https://example.com/lib.zip",
            "1024",
            "abcd",
        ]);
        match cli.command {
            Some(Commands::FetchArchive(args)) => {
                assert_eq!(args.coordinate, "com.example:lib:1.0.0");
                assert_eq!(args.size, 1024);
                assert_eq!(args.sha256, "abcd");
            }
            _ => panic!("expected fetch-archive"),
        }
    }
}

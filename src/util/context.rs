//! Global context for cdep operations.
//!
//! Provides centralized access to configuration and the folder layout:
//!
//! - `{home}/downloads/{group}/{artifact}/{version}/{file}`: downloaded files
//! - `{home}/exploded/{group}/{artifact}/{version}/{file}/`: unpacked archives
//! - `{working folder}/.cdep/modules`: generated build-system glue
//! - `{working folder}/.cdep/examples`: generated example projects
//!
//! `{home}` is `~/.cdep` unless `CDEP_HOME` is set. `--download-folder`
//! replaces it for downloads and unpacked archives only.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};

use crate::core::project::Project;
use crate::generator::GeneratorEnvironment;
use crate::util::config::{load_config, Config};
use crate::util::fs::absolutize;

/// Overrides the cdep home folder.
pub const HOME_ENV: &str = "CDEP_HOME";

/// Manifest hashes recorded by `generate`, in the working folder.
pub const HASHES_FILE: &str = "cdep.sha256";

static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("io", "cdep", "cdep"));

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    working_folder: PathBuf,
    home: PathBuf,
    download_folder: Option<PathBuf>,
    verbose: bool,
    config: Config,
}

impl GlobalContext {
    /// Context for `working_folder` (default: the current directory).
    /// Relative paths are taken relative to the current directory.
    pub fn new(working_folder: Option<&Path>, download_folder: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let working_folder = match working_folder {
            Some(folder) => absolutize(&cwd, folder),
            None => cwd,
        };
        let download_folder = download_folder.map(|d| absolutize(&working_folder, d));
        Ok(Self::with_home(working_folder, default_home(), download_folder))
    }

    /// Context with an explicit home folder.
    pub fn with_home(working_folder: PathBuf, home: PathBuf, download_folder: Option<PathBuf>) -> Self {
        let config = load_config(
            &global_config_path(&home),
            &working_folder.join(".cdep").join("config.toml"),
        );
        tracing::debug!("cdep home is {}", home.display());
        GlobalContext {
            working_folder,
            home,
            download_folder,
            verbose: false,
            config,
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn working_folder(&self) -> &Path {
        &self.working_folder
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn cache_root(&self) -> &Path {
        self.download_folder.as_deref().unwrap_or(&self.home)
    }

    pub fn downloads_folder(&self) -> PathBuf {
        self.cache_root().join("downloads")
    }

    pub fn exploded_folder(&self) -> PathBuf {
        self.cache_root().join("exploded")
    }

    pub fn modules_folder(&self) -> PathBuf {
        self.working_folder.join(".cdep").join("modules")
    }

    pub fn examples_folder(&self) -> PathBuf {
        self.working_folder.join(".cdep").join("examples")
    }

    /// `cdep.yml` in the working folder.
    pub fn project_path(&self) -> PathBuf {
        Project::path_in(&self.working_folder)
    }

    pub fn hashes_path(&self) -> PathBuf {
        self.working_folder.join(HASHES_FILE)
    }

    /// Layout for generators. Scripts call back into the running executable.
    pub fn generator_environment(&self) -> GeneratorEnvironment {
        let executable = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("cdep"));
        GeneratorEnvironment::new(&self.working_folder, &self.exploded_folder(), &executable)
    }
}

/// `$CDEP_HOME`, else `~/.cdep`.
pub fn default_home() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|h| !h.is_empty()) {
        return PathBuf::from(home);
    }
    BaseDirs::new()
        .map(|b| b.home_dir().join(".cdep"))
        .unwrap_or_else(|| PathBuf::from(".cdep"))
}

/// `{home}/config.toml` if present, else the platform config folder.
pub fn global_config_path(home: &Path) -> PathBuf {
    let in_home = home.join("config.toml");
    if in_home.exists() {
        return in_home;
    }
    PROJECT_DIRS
        .as_ref()
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .filter(|path| path.exists())
        .unwrap_or(in_home)
}

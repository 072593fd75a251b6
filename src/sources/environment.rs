//! Download cache and the [`ManifestProvider`] used by every command.
//!
//! Files land at `{downloads}/{group}/{artifact}/{version}/{file}` and
//! archives are unpacked to `{exploded}/{group}/{artifact}/{version}/{file}/`,
//! where `{file}` is the last segment of the remote URL.

use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use url::Url;

use crate::core::coordinate::Coordinate;
use crate::resolver::strategies::parse_manifest;
use crate::resolver::{FetchedManifest, ManifestProvider};
use crate::util::config::Config;
use crate::util::context::GlobalContext;
use crate::util::fs::ensure_dir;
use crate::util::hash::sha256_str;

const USER_AGENT: &str = concat!("cdep/", env!("CARGO_PKG_VERSION"));

/// Local folder layout plus the HTTP client that fills it.
#[derive(Debug)]
pub struct Environment {
    downloads_folder: PathBuf,
    exploded_folder: PathBuf,
    client: Client,
    retries: u32,
    force_redownload: bool,
    show_progress: bool,
    downloaded: HashSet<PathBuf>,
}

impl Environment {
    /// Environment for the folders and network settings of `ctx`.
    pub fn new(ctx: &GlobalContext) -> Result<Self> {
        Self::with_folders(ctx.downloads_folder(), ctx.exploded_folder(), ctx.config())
    }

    pub fn with_folders(downloads_folder: PathBuf, exploded_folder: PathBuf, config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .context("failed to create HTTP client")?;
        Ok(Environment {
            downloads_folder,
            exploded_folder,
            client,
            retries: config.retries(),
            force_redownload: false,
            show_progress: false,
            downloaded: HashSet::new(),
        })
    }

    /// Ignore cached copies. Each file is still fetched at most once.
    pub fn force_redownload(mut self, force: bool) -> Self {
        self.force_redownload = force;
        self
    }

    /// Draw a progress bar for HTTP downloads.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn is_force_redownload(&self) -> bool {
        self.force_redownload
    }

    pub fn downloads_folder(&self) -> &Path {
        &self.downloads_folder
    }

    pub fn exploded_folder(&self) -> &Path {
        &self.exploded_folder
    }

    /// Where the file at `remote` is cached for `coordinate`.
    pub fn local_download_path(&self, coordinate: &Coordinate, remote: &Url) -> PathBuf {
        coordinate_folder(&self.downloads_folder, coordinate).join(url_base_name(remote))
    }

    /// Where the archive at `remote` is unpacked for `coordinate`.
    pub fn local_unzip_folder(&self, coordinate: &Coordinate, remote: &Url) -> PathBuf {
        coordinate_folder(&self.exploded_folder, coordinate).join(url_base_name(remote))
    }

    /// Remove the cached copy of `remote` so the next request fetches it again.
    pub fn discard_download(&mut self, coordinate: &Coordinate, remote: &Url) -> Result<()> {
        let local = self.local_download_path(coordinate, remote);
        self.downloaded.remove(&local);
        if local.exists() {
            std::fs::remove_file(&local)
                .with_context(|| format!("failed to remove {}", local.display()))?;
        }
        Ok(())
    }

    /// Fetch `url` into `dest`. `Ok(false)` when there is nothing there.
    fn fetch(&self, url: &Url, dest: &Path) -> Result<bool> {
        if let Some(parent) = dest.parent() {
            ensure_dir(parent)?;
        }
        match url.scheme() {
            "file" => copy_local(url, dest),
            "http" | "https" => self.fetch_http(url, dest),
            other => bail!("unsupported URL scheme `{}` in {}", other, url),
        }
    }

    fn fetch_http(&self, url: &Url, dest: &Path) -> Result<bool> {
        let mut last_error = None;
        for attempt in 1..=self.retries {
            if attempt > 1 {
                info!("Retrying {}", url);
            }
            match self.client.get(url.clone()).send() {
                Ok(response) if response.status() == StatusCode::NOT_FOUND => return Ok(false),
                Ok(response) if response.status().is_success() => {
                    self.write_response(response, dest)?;
                    return Ok(true);
                }
                Ok(response) => last_error = Some(anyhow!("HTTP {}", response.status())),
                Err(e) => last_error = Some(anyhow::Error::new(e)),
            }
        }
        let error = last_error.unwrap_or_else(|| anyhow!("no attempts were made"));
        Err(error.context(format!("failed to download {}", url)))
    }

    fn write_response(&self, response: Response, dest: &Path) -> Result<()> {
        let folder = dest.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(folder)
            .with_context(|| format!("failed to create temporary file in {}", folder.display()))?;

        let pb = self.progress_bar(response.content_length());
        let mut reader = pb.wrap_read(response);
        io::copy(&mut reader, temp.as_file_mut())
            .with_context(|| format!("failed to write {}", dest.display()))?;
        pb.finish_and_clear();

        temp.persist(dest)
            .map_err(|e| e.error)
            .with_context(|| format!("failed to write {}", dest.display()))?;
        Ok(())
    }

    fn progress_bar(&self, length: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        match length {
            Some(length) => {
                let pb = ProgressBar::new(length);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
                        .map(|style| style.progress_chars("#>-"))
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                pb
            }
            None => ProgressBar::new_spinner(),
        }
    }
}

impl ManifestProvider for Environment {
    fn try_get_manifest(&mut self, coordinate: &Coordinate, url: &Url) -> Result<Option<FetchedManifest>> {
        let Some(path) = self.try_get_local_downloaded_file(coordinate, url)? else {
            return Ok(None);
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let manifest = parse_manifest(&text, &path.to_string_lossy())?;
        Ok(Some(FetchedManifest {
            manifest,
            sha256: sha256_str(&text),
        }))
    }

    fn try_get_local_downloaded_file(&mut self, coordinate: &Coordinate, url: &Url) -> Result<Option<PathBuf>> {
        let local = self.local_download_path(coordinate, url);
        if local.is_file() && !self.force_redownload {
            debug!("Using cached {}", local.display());
            return Ok(Some(local));
        }

        if self.downloaded.contains(&local) {
            // Two packages can share a dependency; a forced run fetches it once.
            if self.force_redownload {
                return Ok(Some(local));
            }
            bail!("tried to download {} twice in the same session", local.display());
        }

        if self.force_redownload {
            info!("Redownloading {}", url);
        } else {
            info!("Downloading {}", url);
        }

        if !self.fetch(url, &local)? {
            info!("  didn't exist, skipping.");
            return Ok(None);
        }
        self.downloaded.insert(local.clone());
        Ok(Some(local))
    }
}

fn copy_local(url: &Url, dest: &Path) -> Result<bool> {
    let source = url
        .to_file_path()
        .map_err(|()| anyhow!("invalid file URL {}", url))?;
    if !source.is_file() {
        return Ok(false);
    }
    let mut reader = File::open(&source)
        .with_context(|| format!("failed to open {}", source.display()))?;
    let mut writer = File::create(dest)
        .with_context(|| format!("failed to create {}", dest.display()))?;
    io::copy(&mut reader, &mut writer)
        .with_context(|| format!("failed to copy {} to {}", source.display(), dest.display()))?;
    Ok(true)
}

fn coordinate_folder(root: &Path, coordinate: &Coordinate) -> PathBuf {
    root.join(&coordinate.group_id)
        .join(&coordinate.artifact_id)
        .join(coordinate.version.as_str())
}

/// Last path segment of `url`.
pub fn url_base_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("download")
        .to_string()
}

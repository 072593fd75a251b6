//! User configuration.
//!
//! cdep reads `config.toml` from its home folder, then from
//! `.cdep/config.toml` in the working folder. The project file takes
//! precedence.
//!
//! ```toml
//! [net]
//! retries = 5
//! timeout = 60
//!
//! [[repositories]]
//! name = "mirror"
//! url = "https://mirror.example.com/cdep"
//! priority = 10
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Attempts per download when `[net] retries` is not set.
pub const DEFAULT_RETRIES: u32 = 3;

/// Seconds before a request times out when `[net] timeout` is not set.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// cdep configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network settings
    pub net: NetConfig,

    /// Manifest repositories, searched in priority order
    pub repositories: Vec<RepositoryEntry>,
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Download attempts before giving up
    pub retries: Option<u32>,

    /// Request timeout in seconds
    pub timeout: Option<u64>,
}

/// A base URL laid out as `{group with . as /}/{artifact}/{version}/cdep-manifest.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub name: String,
    pub url: String,

    /// Lower is searched first
    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_priority() -> i32 {
    100
}

fn default_enabled() -> bool {
    true
}

impl RepositoryEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        RepositoryEntry {
            name: name.into(),
            url: url.into(),
            priority: default_priority(),
            enabled: true,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    ///
    /// Repositories are combined; an entry in `other` replaces one with the
    /// same name.
    pub fn merge(&mut self, other: Config) {
        if other.net.retries.is_some() {
            self.net.retries = other.net.retries;
        }
        if other.net.timeout.is_some() {
            self.net.timeout = other.net.timeout;
        }
        for entry in other.repositories {
            self.repositories.retain(|r| r.name != entry.name);
            self.repositories.push(entry);
        }
    }

    pub fn retries(&self) -> u32 {
        self.net.retries.unwrap_or(DEFAULT_RETRIES).max(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.net.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Enabled repository URLs in priority order. Entries that are not valid
    /// URLs are skipped with a warning.
    pub fn repository_urls(&self) -> Vec<Url> {
        let mut entries: Vec<&RepositoryEntry> =
            self.repositories.iter().filter(|r| r.enabled).collect();
        entries.sort_by_key(|r| r.priority);
        entries
            .into_iter()
            .filter_map(|entry| match Url::parse(&entry.url) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("Ignoring repository `{}`: {}", entry.name, e);
                    None
                }
            })
            .collect()
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.cdep/config.toml)
/// 2. Global config
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();
    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }
    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.retries(), DEFAULT_RETRIES);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.repository_urls().is_empty());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[net]
retries = 5
timeout = 60

[[repositories]]
name = "late"
url = "https://late.example.com/cdep"

[[repositories]]
name = "early"
url = "https://early.example.com/cdep"
priority = 10

[[repositories]]
name = "off"
url = "https://off.example.com/cdep"
enabled = false
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.retries(), 5);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        let urls: Vec<String> = config.repository_urls().iter().map(|u| u.to_string()).collect();
        assert_eq!(
            urls,
            vec!["https://early.example.com/cdep", "https://late.example.com/cdep"]
        );
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.net.retries = Some(2);
        base.repositories.push(RepositoryEntry::new("main", "https://a.example.com"));

        let mut project = Config::default();
        project.net.timeout = Some(5);
        project
            .repositories
            .push(RepositoryEntry::new("main", "https://b.example.com").with_priority(1));

        base.merge(project);
        assert_eq!(base.net.retries, Some(2));
        assert_eq!(base.net.timeout, Some(5));
        assert_eq!(base.repositories.len(), 1);
        assert_eq!(base.repositories[0].url, "https://b.example.com");
    }

    #[test]
    fn test_invalid_config_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[net\nretries = ").unwrap();
        assert_eq!(Config::load_or_default(&path), Config::default());
    }
}

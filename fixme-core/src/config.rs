//! Configuration management for fixme
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (FIXME_*)
//! 3. Config file (~/.config/fixme/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::extract::StrategyKind;
use crate::{Error, Result};

/// Upstream API settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Base URL of the REST API
    pub api_url: String,

    /// Timeout applied to every request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Page size; `None` leaves the upstream default (30)
    pub per_page: Option<u8>,

    /// Pages fetched per repository; 1 keeps first-page-only behaviour
    pub max_pages: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            timeout: Duration::from_secs(30),
            per_page: None,
            max_pages: 1,
        }
    }
}

/// Reconciliation settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Time between passes
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Field extraction strategy
    pub strategy: StrategyKind,

    /// Repositories reconciled at once
    pub concurrency: usize,

    /// Query repository metadata for the primary language
    pub fetch_language: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            strategy: StrategyKind::Labels,
            concurrency: 4,
            fetch_language: true,
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; `None` uses `~/.cache/fixme/fixme.db`
    pub path: Option<PathBuf>,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub sync: SyncConfig,
    pub database: DatabaseConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database: Option<PathBuf>,
    pub strategy: Option<StrategyKind>,
    pub interval: Option<Duration>,
    pub api_url: Option<String>,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::parse(&contents)
    }

    /// Parse TOML configuration text
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/fixme/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("fixme").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - FIXME_API_URL: upstream API base URL
    /// - FIXME_STRATEGY: `labels` or `free-text`
    /// - FIXME_INTERVAL: pass interval, e.g. `15m`
    /// - FIXME_DATABASE: SQLite file path
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(api_url) = var("FIXME_API_URL") {
            self.github.api_url = api_url;
        }

        if let Some(strategy) = var("FIXME_STRATEGY") {
            self.sync.strategy = strategy.parse()?;
        }

        if let Some(interval) = var("FIXME_INTERVAL") {
            self.sync.interval = parse_interval(&interval)
                .map_err(|e| Error::Config(format!("Invalid FIXME_INTERVAL: {}", e)))?;
        }

        if let Some(path) = var("FIXME_DATABASE") {
            self.database.path = Some(PathBuf::from(path));
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, cli: CliOverrides) -> Self {
        if let Some(path) = cli.database {
            self.database.path = Some(path);
        }
        if let Some(strategy) = cli.strategy {
            self.sync.strategy = strategy;
        }
        if let Some(interval) = cli.interval {
            self.sync.interval = interval;
        }
        if let Some(api_url) = cli.api_url {
            self.github.api_url = api_url;
        }
        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(cli: CliOverrides) -> Result<Self> {
        Ok(Self::load()?.with_env_overrides()?.with_cli_overrides(cli))
    }

    /// Database file to open
    pub fn database_path(&self) -> Result<PathBuf> {
        match self.database.path {
            Some(ref path) => Ok(path.clone()),
            None => dirs::cache_dir()
                .map(|p| p.join("fixme").join("fixme.db"))
                .ok_or_else(|| Error::Config("Could not determine cache directory".to_string())),
        }
    }
}

/// Parse a human-readable duration such as `90s` or `15m`
pub fn parse_interval(value: &str) -> Result<Duration> {
    let interval = humantime_serde::re::humantime::parse_duration(value.trim())
        .map_err(|e| Error::Parse(e.to_string()))?;
    if interval.is_zero() {
        return Err(Error::Parse("interval must be greater than zero".to_string()));
    }
    Ok(interval)
}

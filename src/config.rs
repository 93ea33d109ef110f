//! Configuration file handling.
//!
//! This module provides loading and saving of scriptscout configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/scriptscout/config.toml`
//! - macOS: `~/Library/Application Support/scriptscout/config.toml`
//! - Windows: `%APPDATA%\scriptscout\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! workers = 10
//! request_timeout_secs = 5
//! database_ttl_hours = 24
//! default_input = "subdomains.txt"
//! default_format = "text"
//!
//! [retry]
//! max_attempts = 3
//! base_delay_secs = 4
//! max_delay_secs = 10
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::database::DEFAULT_DATABASE_URL;
use crate::fetch::{FetcherConfig, RetryPolicy, DEFAULT_USER_AGENT};
use crate::scan::DEFAULT_WORKERS;

/// Application configuration.
///
/// Every field has a default, so a partial file only overrides what it names.
///
/// # Example
///
/// ```no_run
/// use scriptscout::Config;
///
/// // Load from file (or use defaults if file doesn't exist)
/// let config = Config::load().unwrap();
///
/// println!("Workers: {}", config.workers);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of subdomains scanned concurrently.
    ///
    /// Default: 10
    pub workers: usize,

    /// Per-request timeout, in seconds.
    ///
    /// Default: 5
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Where the vulnerability database is downloaded from.
    pub database_url: String,

    /// Overrides the cached database location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// How long the cached database is trusted before re-downloading, in hours.
    /// `0` keeps it forever.
    ///
    /// Default: 24 hours
    pub database_ttl_hours: u64,

    /// Subdomain list read when neither `--domain` nor `--file` is given.
    ///
    /// Default: "subdomains.txt"
    pub default_input: PathBuf,

    /// Default output format when no `--format` flag is provided.
    ///
    /// Valid values: "text", "json"
    /// Default: "text"
    pub default_format: String,

    /// Retry behaviour for transient fetch failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per subdomain, including the first.
    pub max_attempts: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_secs: policy.base_delay.as_secs(),
            max_delay_secs: policy.max_delay.as_secs(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_secs(config.base_delay_secs),
            max_delay: Duration::from_secs(config.max_delay_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            request_timeout_secs: crate::fetch::DEFAULT_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_path: None,
            database_ttl_hours: 24,
            default_input: PathBuf::from("subdomains.txt"),
            default_format: "text".to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the default config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`, falling back to defaults if it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves the configuration to `path`.
    ///
    /// Creates the parent directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    ///
    /// # Example
    ///
    /// ```
    /// use scriptscout::Config;
    ///
    /// let path = Config::config_path();
    /// assert!(path.ends_with("scriptscout/config.toml"));
    /// ```
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scriptscout")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Location of the cached vulnerability database.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(crate::cache::default_database_path)
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent.clone(),
            retry: RetryPolicy::from(&self.retry),
        }
    }
}

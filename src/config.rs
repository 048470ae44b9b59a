//! Configuration types for download runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::site::SiteProfile;

/// Tuning for the engine, the download pool and the browser waits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of downloads running at the same time.
    pub concurrent_downloads: usize,
    /// Extra attempts after the first failed download attempt.
    pub max_retries: u32,
    /// Default timeout for page waits, in seconds.
    pub wait_timeout_secs: u64,
    /// Timeout for the two player probes, in seconds.
    pub player_wait_timeout_secs: u64,
    /// HTTP connect timeout for media downloads, in seconds.
    pub connect_timeout_secs: u64,
    /// HTTP read timeout for media downloads, in seconds.
    pub read_timeout_secs: u64,
    /// Whether to tick the persistent-login box.
    pub keep_login: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrent_downloads: 5,
            max_retries: 2,
            wait_timeout_secs: 10,
            player_wait_timeout_secs: 25,
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
            keep_login: true,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of concurrent downloads.
    #[must_use]
    pub const fn with_concurrent_downloads(mut self, concurrent: usize) -> Self {
        self.concurrent_downloads = concurrent;
        self
    }

    /// Sets the number of retries after a failed attempt.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets whether to request a persistent login.
    #[must_use]
    pub const fn with_keep_login(mut self, keep: bool) -> Self {
        self.keep_login = keep;
        self
    }

    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    #[must_use]
    pub const fn player_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.player_wait_timeout_secs)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Total attempts made for one download.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Complete application configuration as stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// WebDriver server the browser session connects to.
    pub webdriver_url: String,
    /// Engine and pool settings.
    pub engine: EngineConfig,
    /// Platform addresses and locators.
    pub site: SiteProfile,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            engine: EngineConfig::default(),
            site: SiteProfile::default(),
        }
    }
}

impl AppConfig {
    /// Default location of the config file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tut-dl")
            .join("config.toml")
    }

    /// Loads configuration from `path`, falling back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> crate::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

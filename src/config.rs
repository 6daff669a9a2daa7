//! Configuration module for lurk

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::fourchan::{DEFAULT_API_URL, DEFAULT_MEDIA_URL};
use crate::paths;
use crate::theme::Theme;

/// Shortest allowed watch interval, in seconds
pub const MIN_WATCH_INTERVAL_SECS: u64 = 10;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Selected theme
    #[serde(default)]
    pub theme: Theme,

    /// Base URL of the JSON API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL for images and thumbnails
    #[serde(default = "default_media_url")]
    pub media_url: String,

    /// Seconds between watch-list polls
    #[serde(default = "default_watch_interval")]
    pub watch_interval_secs: u64,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Print reply/image counts with catalog entries
    #[serde(default = "default_show_thread_stats")]
    pub show_thread_stats: bool,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_media_url() -> String {
    DEFAULT_MEDIA_URL.to_string()
}

const fn default_watch_interval() -> u64 {
    60
}

const fn default_request_timeout() -> u64 {
    15
}

const fn default_show_thread_stats() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            api_url: default_api_url(),
            media_url: default_media_url(),
            watch_interval_secs: default_watch_interval(),
            request_timeout_secs: default_request_timeout(),
            show_thread_stats: default_show_thread_stats(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        paths::config_path()
    }

    /// Load config from the default path or create default
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Watch interval, never shorter than [`MIN_WATCH_INTERVAL_SECS`]
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs.max(MIN_WATCH_INTERVAL_SECS))
    }

    /// HTTP request timeout
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

//! Connection settings for the remote mailing service
//!
//! Supports loading settings from (in order of priority):
//! 1. JSON file in the Relaunch config directory
//! 2. Runtime environment variables (fallback)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings filename in the Relaunch config directory
const SETTINGS_FILE: &str = "listmonk.json";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where and how to reach the Listmonk instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Base URL, e.g. "http://localhost:9000"
    pub base_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Per-call timeout enforced by the HTTP transport
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Re-list remotely once when a list name is not cached
    #[serde(default = "default_true")]
    pub refresh_lists_on_miss: bool,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

impl ServiceSettings {
    /// Settings for `base_url` with defaults for everything else
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: None,
            password: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            refresh_lists_on_miss: true,
        }
    }

    /// Builder method to set credentials
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Load settings using the following priority:
    /// 1. JSON file (~/.config/relaunch/listmonk.json)
    /// 2. Runtime environment variables
    pub fn load() -> Result<Self> {
        if config::config_exists(SETTINGS_FILE) {
            return config::load_json(SETTINGS_FILE);
        }
        Self::from_env()
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse settings JSON")
    }

    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("LISTMONK_URL").context("LISTMONK_URL environment variable not set")?;
        let mut settings = Self::new(base_url);
        settings.username = std::env::var("LISTMONK_USERNAME").ok();
        settings.password = std::env::var("LISTMONK_PASSWORD").ok();
        if let Ok(timeout) = std::env::var("LISTMONK_TIMEOUT_SECS") {
            settings.timeout_secs = timeout
                .parse()
                .with_context(|| format!("Invalid LISTMONK_TIMEOUT_SECS: {}", timeout))?;
        }
        Ok(settings)
    }

    /// Get the default settings file path (~/.config/relaunch/listmonk.json)
    pub fn default_settings_path() -> Option<PathBuf> {
        config::config_path(SETTINGS_FILE)
    }
}

//! Configuration Management
//!
//! Handles persistent configuration storage for jcoll.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Jamf Pro API root, e.g. https://jamf.example.com/api
    #[serde(default)]
    pub server_url: Option<String>,
    /// Bearer token for API calls
    #[serde(default)]
    pub token: Option<String>,
    /// Page size used when walking paged listings
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("jcoll").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Get effective server URL (CLI > config > JAMF_URL)
    pub fn effective_server_url(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.server_url.clone())
            .or_else(|| non_empty_env("JAMF_URL"))
    }

    /// Get effective token (CLI > config > JAMF_TOKEN)
    pub fn effective_token(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.token.clone())
            .or_else(|| non_empty_env("JAMF_TOKEN"))
    }

    /// Set server URL and save
    pub fn set_server_url(&mut self, url: &str) -> Result<()> {
        self.server_url = Some(url.to_string());
        self.save()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

//! Client configuration management.
//!
//! This module handles loading and saving the client configuration: backend
//! URL, where the session token is kept, request timeout and the last email
//! used to log in.
//!
//! Configuration is stored at `~/.config/blogdeck/config.json`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{StorageBackend, TokenStore};

/// Application name used for config/cache/data directory paths
const APP_NAME: &str = "blogdeck";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when nothing is configured (the API's dev server)
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding `api_base_url`
pub const ENV_API_URL: &str = "BLOGDECK_API_URL";

/// Environment variable pre-filling the login email
pub const ENV_EMAIL: &str = "BLOGDECK_EMAIL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub storage: StorageBackend,
    pub request_timeout_secs: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage: StorageBackend::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            last_email: None,
        }
    }
}

impl Config {
    /// Load the config file and apply `BLOGDECK_*` environment overrides.
    /// Overrides stay in memory; see [`save_last_email`](Self::save_last_email).
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?, |key| std::env::var(key).ok())
    }

    fn load_from<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_file(path)?;
        config.apply_env_overrides(lookup);
        debug!(api_base_url = %config.api_base_url, storage = ?config.storage, "Config loaded");
        Ok(config)
    }

    /// File contents only, defaults if the file doesn't exist.
    fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Remember the last email used to log in. Re-reads the file so
    /// environment overrides in the running config never reach disk.
    pub fn save_last_email(&mut self, email: &str) -> Result<()> {
        self.last_email = Some(email.to_string());
        Self::save_last_email_to(&Self::config_path()?, email)
    }

    fn save_last_email_to(path: &Path, email: &str) -> Result<()> {
        let mut on_disk = Self::load_file(path)?;
        on_disk.last_email = Some(email.to_string());
        on_disk.save_to(path)
    }

    /// Apply `BLOGDECK_*` overrides; `lookup` is `std::env::var` outside tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(email) = lookup(ENV_EMAIL).filter(|v| !v.trim().is_empty()) {
            self.last_email = Some(email.trim().to_string());
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for logs.
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Directory holding the token file.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Open the configured token store.
    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>> {
        let data_dir = match self.storage {
            StorageBackend::File => self.data_dir()?,
            StorageBackend::Keyring | StorageBackend::Memory => PathBuf::new(),
        };
        Ok(self.storage.open(data_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert!(config.last_email.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"storage": "keyring"}"#).expect("parse");
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            ENV_API_URL => Some(" https://blog.example.com ".to_string()),
            ENV_EMAIL => Some("alice@x.com".to_string()),
            _ => None,
        });
        assert_eq!(config.api_base_url, "https://blog.example.com");
        assert_eq!(config.last_email.as_deref(), Some("alice@x.com"));
    }

    #[test]
    fn test_blank_env_override_is_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(|_| Some("   ".to_string()));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.last_email.is_none());
    }

    #[test]
    fn test_env_overrides_are_not_saved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let staging = |key: &str| match key {
            ENV_API_URL => Some("http://staging.invalid".to_string()),
            _ => None,
        };

        let config = Config::load_from(&path, staging).expect("load");
        assert_eq!(config.api_base_url, "http://staging.invalid");
        Config::save_last_email_to(&path, "alice@x.com").expect("save");

        let reloaded = Config::load_from(&path, |_| None).expect("reload");
        assert_eq!(reloaded.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(reloaded.last_email.as_deref(), Some("alice@x.com"));
    }

    #[test]
    fn test_save_last_email_keeps_other_file_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let file_config = Config {
            api_base_url: "https://blog.example.com".to_string(),
            storage: StorageBackend::Keyring,
            ..Config::default()
        };
        file_config.save_to(&path).expect("write");

        Config::save_last_email_to(&path, "bob@x.com").expect("save");

        let reloaded = Config::load_from(&path, |_| None).expect("reload");
        assert_eq!(reloaded.api_base_url, "https://blog.example.com");
        assert_eq!(reloaded.storage, StorageBackend::Keyring);
        assert_eq!(reloaded.last_email.as_deref(), Some("bob@x.com"));
    }

    #[test]
    fn test_memory_token_store_needs_no_directories() {
        let config = Config {
            storage: StorageBackend::Memory,
            ..Config::default()
        };
        let store = config.token_store().expect("memory store");
        assert!(store.load().expect("load").is_none());
    }
}

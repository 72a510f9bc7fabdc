//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! backend URL, session storage backend, HTTP tuning, and the last used
//! city and email.
//!
//! Configuration is stored at `~/.config/marketdash/config.json`. The
//! backend URL can be overridden with `MARKETDASH_API_BASE_URL`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::ClientConfig;
use crate::auth::{FileStorage, KeyringStorage, MemoryStorage, SessionStorage};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "marketdash";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when neither the environment nor the config file names one.
pub const DEFAULT_API_BASE_URL: &str = "https://www.refinedreport.com/backend/";

/// Environment variable overriding the backend URL
pub const API_BASE_URL_ENV: &str = "MARKETDASH_API_BASE_URL";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Retries for rate-limited (429) requests before giving up.
const DEFAULT_MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Where the session is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub storage: StorageBackend,
    pub request_timeout_secs: u64,
    pub max_rate_limit_retries: u32,
    pub last_city: Option<String>,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            storage: StorageBackend::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_rate_limit_retries: DEFAULT_MAX_RATE_LIMIT_RETRIES,
            last_city: None,
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Backend URL: environment first, then the config file, then the default.
    pub fn base_url(&self) -> Result<Url> {
        let from_env = std::env::var(API_BASE_URL_ENV).ok();
        resolve_base_url(from_env.as_deref(), self.api_base_url.as_deref())
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        Ok(ClientConfig {
            base_url: self.base_url()?,
            timeout: Duration::from_secs(self.request_timeout_secs),
            max_rate_limit_retries: self.max_rate_limit_retries,
            ..ClientConfig::default()
        })
    }

    /// Open the configured session storage backend.
    pub fn open_storage(&self) -> Result<Arc<dyn SessionStorage>> {
        Ok(match self.storage {
            StorageBackend::File => Arc::new(FileStorage::in_dir(self.cache_dir()?)),
            StorageBackend::Keyring => Arc::new(KeyringStorage::new()),
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        })
    }
}

/// Pick the first non-empty candidate and normalize it so relative endpoint
/// paths join under it (trailing slash).
pub fn resolve_base_url(from_env: Option<&str>, from_config: Option<&str>) -> Result<Url> {
    let raw = [from_env, from_config]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(DEFAULT_API_BASE_URL);

    let mut normalized = raw.to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).with_context(|| format!("Invalid API base URL: {}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_base_url_precedence() {
        let url = resolve_base_url(Some("http://env.local/api"), Some("http://file.local/"))
            .expect("url");
        assert_eq!(url.as_str(), "http://env.local/api/");

        let url = resolve_base_url(Some("  "), Some("http://file.local")).expect("url");
        assert_eq!(url.as_str(), "http://file.local/");

        let url = resolve_base_url(None, None).expect("url");
        assert_eq!(url.as_str(), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_resolve_base_url_rejects_garbage() {
        assert!(resolve_base_url(Some("not a url"), None).is_err());
    }

    #[test]
    fn test_config_roundtrip_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let loaded = Config::load_from(&path).expect("load missing");
        assert_eq!(loaded.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(loaded.storage, StorageBackend::File);

        let config = Config {
            storage: StorageBackend::Keyring,
            last_city: Some("Austin".to_string()),
            ..Config::default()
        };
        config.save_to(&path).expect("save");
        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.storage, StorageBackend::Keyring);
        assert_eq!(loaded.last_city.as_deref(), Some("Austin"));
        assert_eq!(loaded.max_rate_limit_retries, DEFAULT_MAX_RATE_LIMIT_RETRIES);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"storage": "memory"}"#).expect("write");
        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.storage, StorageBackend::Memory);
        assert_eq!(loaded.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }
}

//! Application configuration management.
//!
//! Configuration holds the API base URL, an optional request timeout, the
//! credential storage backend and the last username used to sign in.
//!
//! Configuration is stored at `~/.config/taskdeck/config.json`; the API URL
//! can be overridden with `TASKDECK_API_URL`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{CredentialStore, FileStorage, KeyringStorage};

/// Application name used for config/data directory paths and the keychain service
const APP_NAME: &str = "taskdeck";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Credential file name (file storage backend)
const CREDENTIALS_FILE: &str = "credentials.json";

/// Backend used when none is configured
const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "TASKDECK_API_URL";

/// Where the session credential is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// JSON file in the user data directory
    #[default]
    File,
    /// OS keychain
    Keyring,
    /// Not persisted; the session ends with the process
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    /// No timeout when unset: a hung request waits indefinitely
    pub request_timeout_secs: Option<u64>,
    pub storage: StorageKind,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: None,
            storage: StorageKind::default(),
            last_username: None,
        }
    }
}

impl Config {
    /// Load from disk (defaults when absent), then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env();
        debug!(api_base_url = %config.api_base_url, storage = ?config.storage, "Config loaded");
        Ok(config)
    }

    /// The config file alone, without environment overrides. Use this as the
    /// base for changes that get saved back.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn credentials_path() -> Result<PathBuf> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(CREDENTIALS_FILE))
    }

    /// Build the credential store for the configured backend
    pub fn credential_store(&self) -> Result<CredentialStore> {
        Ok(match self.storage {
            StorageKind::File => CredentialStore::new(FileStorage::new(Self::credentials_path()?)),
            StorageKind::Keyring => CredentialStore::new(KeyringStorage::new(APP_NAME)),
            StorageKind::Memory => CredentialStore::in_memory(),
        })
    }
}

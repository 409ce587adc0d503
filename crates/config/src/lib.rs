#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for relsync
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/relsync/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod core;

pub use self::core::{
    FeedConfig, NetworkConfig, PlatformConfig, StoreConfig, TargetConfig, TransferConfig,
};

use relsync_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default)]
    pub network: NetworkConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("relsync").join("config.toml"))
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this structure.
    pub fn from_toml_str(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        tracing::debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml_str(&contents)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with process environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_env_from(|name| std::env::var(name).ok())
    }

    /// Merge with variables supplied by `lookup`
    ///
    /// Empty values are ignored so they never mask file settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn merge_env_from<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(container) = get("RELSYNC_CONTAINER") {
            self.target.container = Some(container);
        }
        if let Some(key) = get("RELSYNC_OBJECT_KEY") {
            self.target.object_key = Some(key);
        }
        if let Some(os) = get("RELSYNC_OS") {
            self.platform.os = os;
        }
        if let Some(arch) = get("RELSYNC_ARCH") {
            self.platform.arch = arch;
        }
        if let Some(root) = get("RELSYNC_STORE_ROOT") {
            self.store.root = Some(PathBuf::from(root));
        }
        if let Some(sse) = get("RELSYNC_SSE") {
            self.store.sse = Some(sse);
        }
        if let Some(token) = get("RELSYNC_GITHUB_TOKEN") {
            self.feed.token = Some(token);
        }
        if let Some(retries) = get("RELSYNC_RETRIES") {
            self.network.retries = retries.parse().map_err(|_| ConfigError::InvalidValue {
                field: "RELSYNC_RETRIES".to_string(),
                value: retries,
            })?;
        }

        Ok(())
    }

    /// Check values that would make a cycle impossible regardless of target
    ///
    /// # Errors
    ///
    /// Returns an error for zero-sized buffers or parts, or an empty platform.
    pub fn validate(&self) -> Result<(), Error> {
        if self.transfer.buffer_chunks == 0 {
            return Err(invalid("transfer.buffer_chunks", "0"));
        }
        if self.store.part_size == 0 {
            return Err(invalid("store.part_size", "0"));
        }
        if self.transfer.deadline == 0 {
            return Err(invalid("transfer.deadline", "0"));
        }
        if self.transfer.chunk_timeout == 0 {
            return Err(invalid("transfer.chunk_timeout", "0"));
        }
        if self.platform.os.trim().is_empty() {
            return Err(ConfigError::missing("platform.os").into());
        }
        if self.platform.arch.trim().is_empty() {
            return Err(ConfigError::missing("platform.arch").into());
        }
        Ok(())
    }

    /// Get the blob store root (with default)
    #[must_use]
    pub fn store_root(&self) -> PathBuf {
        self.store.root.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("relsync")
                .join("blobs")
        })
    }
}

fn invalid(field: &str, value: &str) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

//! Configuration sections

use relsync_types::{MirrorTarget, Platform};
use relsync_errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Destination object; both values are required at sync time
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TargetConfig {
    pub container: Option<String>,
    pub object_key: Option<String>,
}

impl TargetConfig {
    /// Validate into a `MirrorTarget`
    ///
    /// # Errors
    ///
    /// Returns an error if either value is missing or blank.
    pub fn to_target(&self) -> Result<MirrorTarget, ConfigError> {
        MirrorTarget::from_parts(self.container.as_deref(), self.object_key.as_deref())
    }
}

/// Platform the mirrored asset is selected for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_os")]
    pub os: String,
    #[serde(default = "default_arch")]
    pub arch: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            os: default_os(),
            arch: default_arch(),
        }
    }
}

impl PlatformConfig {
    #[must_use]
    pub fn platform(&self) -> Platform {
        Platform::new(self.os.clone(), self.arch.clone())
    }
}

/// Release feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// `owner/repo` whose latest release is mirrored
    #[serde(default = "default_repository")]
    pub repository: String,
    /// Bearer token for the feed API
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            repository: default_repository(),
            token: None,
        }
    }
}

/// Blob store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub root: Option<PathBuf>,
    /// Server-side encryption setting, passed through untouched
    pub sse: Option<String>,
    #[serde(default = "default_part_size")]
    pub part_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: None,
            sse: None,
            part_size: default_part_size(),
        }
    }
}

/// Stream transfer tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Chunks held between the download and upload legs
    #[serde(default = "default_buffer_chunks")]
    pub buffer_chunks: usize,
    #[serde(default = "default_chunk_timeout")]
    pub chunk_timeout: u64, // seconds
    /// Upper bound for a whole sync cycle
    #[serde(default = "default_deadline")]
    pub deadline: u64, // seconds
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            buffer_chunks: default_buffer_chunks(),
            chunk_timeout: default_chunk_timeout(),
            deadline: default_deadline(),
        }
    }
}

impl TransferConfig {
    #[must_use]
    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout)
    }

    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline)
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    /// Whole-cycle retries performed by the CLI
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

// Default value functions for serde
fn default_os() -> String {
    "linux".to_string()
}

fn default_arch() -> String {
    "x64".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_repository() -> String {
    "actions/runner".to_string()
}

fn default_part_size() -> usize {
    8 * 1024 * 1024 // 8 MiB
}

fn default_buffer_chunks() -> usize {
    16
}

fn default_chunk_timeout() -> u64 {
    30
}

fn default_deadline() -> u64 {
    900 // 15 minutes
}

fn default_timeout() -> u64 {
    3600 // large artifacts over slow links
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    0
}

fn default_retry_delay() -> u64 {
    1
}

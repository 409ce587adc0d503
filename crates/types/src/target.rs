//! Mirror destination and platform selection

use relsync_errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by every upstream runner asset name
pub const ASSET_PREFIX: &str = "actions-runner";

/// Destination object in the blob store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MirrorTarget {
    pub container: String,
    pub object_key: String,
}

impl MirrorTarget {
    /// Build a target from optional configuration values.
    ///
    /// Blank values count as missing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` naming every absent field.
    pub fn from_parts(
        container: Option<&str>,
        object_key: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let container = container.map(str::trim).filter(|s| !s.is_empty());
        let object_key = object_key.map(str::trim).filter(|s| !s.is_empty());

        match (container, object_key) {
            (Some(container), Some(object_key)) => Ok(Self {
                container: container.to_string(),
                object_key: object_key.to_string(),
            }),
            (None, Some(_)) => Err(ConfigError::missing("target.container")),
            (Some(_), None) => Err(ConfigError::missing("target.object_key")),
            (None, None) => Err(ConfigError::missing("target.container, target.object_key")),
        }
    }
}

impl fmt::Display for MirrorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.object_key)
    }
}

/// Operating system and architecture pair an asset is selected for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Substring an asset name must contain for the given release version.
    ///
    /// The trailing dot keeps `2.1` from matching `2.10`.
    #[must_use]
    pub fn asset_pattern(&self, version: &str) -> String {
        format!("{ASSET_PREFIX}-{}-{}-{version}.", self.os, self.arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

//! Upstream release and blob-store metadata values

use serde::{Deserialize, Serialize};

/// Metadata key under which the mirrored asset name is stored
pub const VERSION_TAG_KEY: &str = "name";

/// Latest release as published by the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Version identifier exactly as published (may carry a `v` prefix)
    pub version_tag: String,
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// Version identifier with a single leading `v`/`V` removed
    #[must_use]
    pub fn version(&self) -> &str {
        self.version_tag
            .strip_prefix(['v', 'V'])
            .unwrap_or(&self.version_tag)
    }
}

/// A single downloadable file of a release
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// Full upstream filename, version included
    pub name: String,
    pub download_url: String,
}

impl ReleaseAsset {
    #[must_use]
    pub fn new(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
        }
    }

    /// The tag set that records this asset on the mirrored object
    #[must_use]
    pub fn version_tags(&self) -> Vec<ObjectTag> {
        vec![ObjectTag::new(VERSION_TAG_KEY, self.name.clone())]
    }
}

/// Key/value metadata entry attached to a stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectTag {
    pub key: String,
    pub value: String,
}

impl ObjectTag {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_strips_single_prefix() {
        let release = Release {
            version_tag: "v2.296.2".into(),
            assets: Vec::new(),
        };
        assert_eq!(release.version(), "2.296.2");

        let bare = Release {
            version_tag: "2.296.2".into(),
            assets: Vec::new(),
        };
        assert_eq!(bare.version(), "2.296.2");
    }

    #[test]
    fn test_version_tags_use_name_key() {
        let asset = ReleaseAsset::new(
            "actions-runner-linux-x64-2.296.2.tar.gz",
            "https://example.com/a.tar.gz",
        );
        let tags = asset.version_tags();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].key, "name");
        assert_eq!(tags[0].value, "actions-runner-linux-x64-2.296.2.tar.gz");
    }
}

//! Tag-based version cache
//!
//! The mirrored object carries the name of the asset it was copied from.
//! Reading that tag is enough to tell whether the mirror is current.

use relsync_errors::StorageError;
use relsync_types::{MirrorTarget, VERSION_TAG_KEY};
use std::sync::Arc;

use crate::blob::BlobStore;

/// How a version tag read ended
#[derive(Debug, Clone)]
pub enum TagLookup {
    /// Exactly one tag with the version key
    Found(String),
    /// No object, or an object without the version key
    Missing,
    /// Several tags share the version key
    Ambiguous { count: usize },
    /// The store could not be read
    Unreadable(StorageError),
}

impl TagLookup {
    /// Collapse to the cached version; anything but `Found` means unknown
    #[must_use]
    pub fn into_version(self) -> Option<String> {
        match self {
            Self::Found(tag) => Some(tag),
            Self::Missing | Self::Ambiguous { .. } | Self::Unreadable(_) => None,
        }
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Found(tag) => Some(tag),
            _ => None,
        }
    }

    /// Whether the outcome hides a problem worth surfacing
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Ambiguous { .. } | Self::Unreadable(_))
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::Missing => "missing",
            Self::Ambiguous { .. } => "ambiguous",
            Self::Unreadable(_) => "unreadable",
        }
    }
}

/// Reads the version tag of mirrored objects
#[derive(Clone)]
pub struct VersionCache {
    store: Arc<dyn BlobStore>,
    tag_key: String,
}

impl std::fmt::Debug for VersionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionCache")
            .field("tag_key", &self.tag_key)
            .finish_non_exhaustive()
    }
}

impl VersionCache {
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            tag_key: VERSION_TAG_KEY.to_string(),
        }
    }

    /// Look up the version tag of `target`
    ///
    /// Never fails; read errors come back as `TagLookup::Unreadable`.
    pub async fn lookup(&self, target: &MirrorTarget) -> TagLookup {
        let tags = match self.store.read_object_tags(target).await {
            Ok(tags) => tags,
            Err(StorageError::ObjectNotFound { .. }) => return TagLookup::Missing,
            Err(e) => return TagLookup::Unreadable(e),
        };

        let mut values = tags
            .into_iter()
            .filter(|tag| tag.key == self.tag_key)
            .map(|tag| tag.value);

        match (values.next(), values.next()) {
            (None, _) => TagLookup::Missing,
            (Some(value), None) => TagLookup::Found(value),
            (Some(_), Some(_)) => TagLookup::Ambiguous {
                count: 2 + values.count(),
            },
        }
    }

    /// The cached asset name, or `None` when unknown for any reason
    pub async fn read_current_tag(&self, target: &MirrorTarget) -> Option<String> {
        self.lookup(target).await.into_version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBlobStore;
    use relsync_types::ObjectTag;

    fn target() -> MirrorTarget {
        MirrorTarget::from_parts(Some("mirror"), Some("runner.tar.gz")).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_outcomes() {
        let store = MemoryBlobStore::new();
        let cache = VersionCache::new(Arc::new(store.clone()));

        assert!(matches!(cache.lookup(&target()).await, TagLookup::Missing));

        store
            .insert(target(), "body", vec![ObjectTag::new("name", "a.tar.gz")])
            .await;
        assert_eq!(cache.read_current_tag(&target()).await.as_deref(), Some("a.tar.gz"));

        store
            .insert(
                target(),
                "body",
                vec![ObjectTag::new("name", "a"), ObjectTag::new("name", "b")],
            )
            .await;
        let lookup = cache.lookup(&target()).await;
        assert!(matches!(lookup, TagLookup::Ambiguous { count: 2 }));
        assert!(lookup.is_degraded());
        assert!(lookup.into_version().is_none());

        store
            .insert(target(), "body", vec![ObjectTag::new("owner", "ci")])
            .await;
        assert!(matches!(cache.lookup(&target()).await, TagLookup::Missing));
    }
}

//! Latest-release resolver

use std::sync::Arc;

use relsync_errors::ResolveError;
use relsync_net::ReleaseFeed;
use relsync_types::{Platform, ReleaseAsset};

use crate::select::select_asset;

/// An asset together with the release it came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Release tag as published
    pub release: String,
    pub asset: ReleaseAsset,
}

/// Resolves the newest runner asset for a platform
///
/// Feed errors are returned as they are; there is no retry here.
#[derive(Clone)]
pub struct Resolver {
    feed: Arc<dyn ReleaseFeed>,
    repository: String,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    #[must_use]
    pub fn new(feed: Arc<dyn ReleaseFeed>, repository: impl Into<String>) -> Self {
        Self {
            feed,
            repository: repository.into(),
        }
    }

    /// Repository whose releases are queried
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Resolve the asset for `platform` in the latest release
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Feed` when the feed fails, otherwise the
    /// selection errors of [`select_asset`].
    pub async fn resolve(&self, platform: &Platform) -> Result<Resolution, ResolveError> {
        let release = self.feed.latest_release(&self.repository).await?;
        let asset = select_asset(&release, platform)?;
        Ok(Resolution {
            release: release.version_tag,
            asset,
        })
    }

    /// Resolve by raw os/arch strings
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub async fn resolve_asset(&self, os: &str, arch: &str) -> Result<ReleaseAsset, ResolveError> {
        self.resolve(&Platform::new(os, arch))
            .await
            .map(|resolution| resolution.asset)
    }
}

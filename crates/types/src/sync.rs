//! Sync decision and report values

use crate::{MirrorTarget, Platform, ReleaseAsset};
use serde::{Deserialize, Serialize};

/// Outcome of comparing the resolved asset with the cached version tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "asset", rename_all = "snake_case")]
pub enum SyncDecision {
    /// Mirror already holds the resolved asset
    UpToDate,
    /// Mirror is missing, unreadable, or holds something else
    Stale(ReleaseAsset),
    /// No usable asset could be resolved for the platform
    UnknownAsset,
}

impl SyncDecision {
    /// Compare by exact string equality.
    ///
    /// A renamed upstream file with an unchanged semantic version is a new
    /// artifact; an absent tag is always stale.
    #[must_use]
    pub fn decide(asset: &ReleaseAsset, cached_tag: Option<&str>) -> Self {
        match cached_tag {
            Some(tag) if tag == asset.name => Self::UpToDate,
            _ => Self::Stale(asset.clone()),
        }
    }

    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, Self::UpToDate)
    }
}

/// Result of a completed sync cycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Nothing was written
    UpToDate {
        target: MirrorTarget,
        asset: ReleaseAsset,
    },
    /// Object body and version tag were replaced
    Updated {
        target: MirrorTarget,
        asset: ReleaseAsset,
        previous_tag: Option<String>,
        bytes: u64,
        duration_ms: u64,
    },
}

impl SyncOutcome {
    #[must_use]
    pub fn asset(&self) -> &ReleaseAsset {
        match self {
            Self::UpToDate { asset, .. } | Self::Updated { asset, .. } => asset,
        }
    }

    #[must_use]
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// Check-only view of a cycle: everything up to the decision
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncPlan {
    pub target: MirrorTarget,
    pub platform: Platform,
    pub asset: Option<ReleaseAsset>,
    pub cached_tag: Option<String>,
    /// How the cache read ended (`found`, `missing`, `ambiguous`, `unreadable`)
    pub cache_lookup: String,
    pub decision: SyncDecision,
    /// Why no asset was resolved, when `decision` is `UnknownAsset`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_error: Option<String>,
}

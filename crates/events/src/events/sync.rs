use relsync_types::{MirrorTarget, Platform, ReleaseAsset};
use serde::{Deserialize, Serialize};

use super::FailureContext;

/// How a version-tag read ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheLookupKind {
    Found,
    Missing,
    Ambiguous,
    Unreadable,
}

impl CacheLookupKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::Missing => "missing",
            Self::Ambiguous => "ambiguous",
            Self::Unreadable => "unreadable",
        }
    }
}

/// Events describing one check-and-sync cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// Cycle started for a validated target
    Started {
        target: MirrorTarget,
        platform: Platform,
    },

    /// The feed yielded exactly one matching asset
    AssetResolved {
        release: String,
        asset: ReleaseAsset,
    },

    /// Version tag read finished
    CacheChecked {
        target: MirrorTarget,
        lookup: CacheLookupKind,
        tag: Option<String>,
        /// Underlying store error when the read was unreadable
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    /// Mirror already holds the resolved asset
    UpToDate {
        target: MirrorTarget,
        asset: String,
    },

    /// Mirror will be replaced
    Stale {
        target: MirrorTarget,
        asset: String,
        cached: Option<String>,
    },

    /// Object body and tag were replaced
    Updated {
        target: MirrorTarget,
        asset: String,
        bytes: u64,
    },

    /// Cycle failed
    Failed {
        target: Option<MirrorTarget>,
        failure: FailureContext,
    },
}

//! Release resolution error types

use std::borrow::Cow;

use crate::{NetworkError, UserFacingError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("release {version} has no assets")]
    NoAssets { version: String },

    #[error("no asset matching `{pattern}` in release {version}")]
    NoMatch { version: String, pattern: String },

    #[error("{count} assets match `{pattern}` in release {version}")]
    Ambiguous {
        version: String,
        pattern: String,
        count: usize,
    },

    #[error("release feed error: {0}")]
    Feed(#[from] NetworkError),
}

impl ResolveError {
    /// Whether the failure means the release has no usable asset for the platform
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoAssets { .. } | Self::NoMatch { .. } | Self::Ambiguous { .. }
        )
    }
}

impl UserFacingError for ResolveError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NoAssets { .. } | Self::NoMatch { .. } => {
                Some("Check the configured os/arch against the asset names in the latest release.")
            }
            Self::Ambiguous { .. } => {
                Some("The latest release publishes several candidates for this platform; nothing was mirrored.")
            }
            Self::Feed(err) => err.user_hint(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Feed(err) => err.is_retryable(),
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Self::NoAssets { .. } => Some("resolve.no_assets"),
            Self::NoMatch { .. } => Some("resolve.no_match"),
            Self::Ambiguous { .. } => Some("resolve.ambiguous"),
            Self::Feed(err) => err.user_code(),
        }
    }
}

//! Sync cycle error types
//!
//! A cycle fails with exactly one of three kinds: the mirror target was not
//! configured, the upstream asset could not be resolved, or the transfer
//! failed. Cache read problems never surface here.

use std::borrow::Cow;

use crate::{ConfigError, NetworkError, ResolveError, StorageError, UserFacingError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum TransferError {
    #[error("download failed: {0}")]
    Download(NetworkError),

    #[error("upload failed: {0}")]
    Upload(StorageError),

    #[error("transfer deadline of {seconds}s exceeded")]
    DeadlineExceeded { seconds: u64 },

    #[error("transfer task failed: {message}")]
    TaskFailed { message: String },
}

impl UserFacingError for TransferError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Download(err) => err.user_hint(),
            Self::Upload(err) => err.user_hint(),
            Self::DeadlineExceeded { .. } => {
                Some("Raise [transfer].deadline or check throughput between the feed and the store.")
            }
            Self::TaskFailed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Download(err) => err.is_retryable(),
            Self::Upload(err) => err.is_retryable(),
            Self::DeadlineExceeded { .. } => true,
            Self::TaskFailed { .. } => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Self::Download(_) => Some("transfer.download"),
            Self::Upload(_) => Some("transfer.upload"),
            Self::DeadlineExceeded { .. } => Some("transfer.deadline_exceeded"),
            Self::TaskFailed { .. } => Some("transfer.task_failed"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("asset resolution failed: {0}")]
    AssetResolution(#[from] ResolveError),

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

impl UserFacingError for SyncError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Configuration(err) => err.user_hint(),
            Self::AssetResolution(err) => err.user_hint(),
            Self::Transfer(err) => err.user_hint(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Configuration(_) => false,
            Self::AssetResolution(err) => err.is_retryable(),
            Self::Transfer(err) => err.is_retryable(),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Self::Configuration(err) => err.user_code(),
            Self::AssetResolution(err) => err.user_code(),
            Self::Transfer(err) => err.user_code(),
        }
    }
}

//! Blob store error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("object not found: {container}/{key}")]
    ObjectNotFound { container: String, key: String },

    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("disk full: {path}")]
    DiskFull { path: String },

    #[error("invalid path: {path}")]
    InvalidPath { path: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("corrupted data: {message}")]
    CorruptedData { message: String },

    #[error("upload failed for {container}/{key}: {message}")]
    UploadFailed {
        container: String,
        key: String,
        message: String,
    },

    #[error("upload aborted for {container}/{key}: {reason}")]
    UploadAborted {
        container: String,
        key: String,
        reason: String,
    },

    #[error("atomic rename failed: {message}")]
    AtomicRenameFailed { message: String },
}

impl StorageError {
    /// Convert an `io::Error` into a `StorageError` with an associated path
    #[must_use]
    pub fn from_io_with_path(err: &std::io::Error, path: &std::path::Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.display().to_string(),
            },
            std::io::ErrorKind::StorageFull => Self::DiskFull {
                path: path.display().to_string(),
            },
            _ => Self::IoError {
                message: format!("{}: {}", path.display(), err),
            },
        }
    }
}

impl UserFacingError for StorageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::DiskFull { .. } => Some("Free up space in the blob store root and retry."),
            Self::PermissionDenied { .. } => {
                Some("Adjust permissions on the blob store root or run as its owner.")
            }
            Self::InvalidPath { .. } => {
                Some("Object keys must be relative and must not contain `..` segments.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::IoError { .. } | Self::UploadFailed { .. } | Self::UploadAborted { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ObjectNotFound { .. } => "storage.object_not_found",
            Self::PermissionDenied { .. } => "storage.permission_denied",
            Self::DiskFull { .. } => "storage.disk_full",
            Self::InvalidPath { .. } => "storage.invalid_path",
            Self::IoError { .. } => "storage.io_error",
            Self::CorruptedData { .. } => "storage.corrupted_data",
            Self::UploadFailed { .. } => "storage.upload_failed",
            Self::UploadAborted { .. } => "storage.upload_aborted",
            Self::AtomicRenameFailed { .. } => "storage.atomic_rename_failed",
        };
        Some(code)
    }
}

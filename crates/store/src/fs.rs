//! Filesystem-backed blob store
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<container>/<key>                  object body
//! <root>/<container>/.tags/<key>.json       tag sidecar
//! <root>/<container>/.staging/<uuid>.part   in-flight uploads
//! ```
//!
//! A commit renames the body into place first and then the sidecar. A crash
//! between the two leaves the new body under the old tags; the next cycle
//! sees a stale tag and transfers once more.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use relsync_errors::StorageError;
use relsync_types::{MirrorTarget, ObjectTag};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::blob::{BlobStore, PartBuffer, ProgressFn, UploadBody, UploadReceipt, UploadRequest};

const TAGS_DIR: &str = ".tags";
const STAGING_DIR: &str = ".staging";

/// Contents of a tag sidecar file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TagSidecar {
    tags: Vec<ObjectTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sse: Option<String>,
    size: u64,
    updated_at: DateTime<Utc>,
}

/// Removes a staging file unless the upload committed
struct StagingGuard {
    path: PathBuf,
    armed: bool,
}

impl StagingGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if self.armed {
            // Best-effort cleanup - ignore errors
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// `BlobStore` rooted at a local directory
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_dir(&self, target: &MirrorTarget) -> Result<PathBuf, StorageError> {
        let container = Path::new(&target.container);
        if container.components().count() != 1 || !is_plain(container) {
            return Err(StorageError::InvalidPath {
                path: target.container.clone(),
            });
        }
        Ok(self.root.join(container))
    }

    /// Path of the object body
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for keys that would escape the container or
    /// collide with the store's bookkeeping directories.
    pub fn object_path(&self, target: &MirrorTarget) -> Result<PathBuf, StorageError> {
        let key = Path::new(&target.object_key);
        let reserved = key
            .components()
            .next()
            .is_some_and(|c| c.as_os_str() == TAGS_DIR || c.as_os_str() == STAGING_DIR);
        if !is_plain(key) || reserved {
            return Err(StorageError::InvalidPath {
                path: target.object_key.clone(),
            });
        }
        Ok(self.container_dir(target)?.join(key))
    }

    fn tags_path(&self, target: &MirrorTarget) -> Result<PathBuf, StorageError> {
        // validates the key as a side effect
        self.object_path(target)?;
        Ok(self
            .container_dir(target)?
            .join(TAGS_DIR)
            .join(format!("{}.json", target.object_key)))
    }

    fn staging_path(&self, target: &MirrorTarget) -> Result<PathBuf, StorageError> {
        Ok(self
            .container_dir(target)?
            .join(STAGING_DIR)
            .join(format!("{}.part", uuid::Uuid::new_v4())))
    }

    async fn write_sidecar(&self, target: &MirrorTarget, sidecar: &TagSidecar) -> Result<(), StorageError> {
        let path = self.tags_path(target)?;
        ensure_parent(&path).await?;

        let json = serde_json::to_vec_pretty(sidecar).map_err(|e| StorageError::IoError {
            message: e.to_string(),
        })?;

        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));
        let mut guard = StagingGuard::new(tmp.clone());
        fs::write(&tmp, json)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, &tmp))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::AtomicRenameFailed {
                message: format!("{}: {e}", path.display()),
            })?;
        guard.disarm();
        Ok(())
    }
}

fn is_plain(path: &Path) -> bool {
    path.components().next().is_some()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

async fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, parent))?;
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read_object_tags(&self, target: &MirrorTarget) -> Result<Vec<ObjectTag>, StorageError> {
        let object = self.object_path(target)?;
        match fs::metadata(&object).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(StorageError::ObjectNotFound {
                    container: target.container.clone(),
                    key: target.object_key.clone(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::ObjectNotFound {
                    container: target.container.clone(),
                    key: target.object_key.clone(),
                })
            }
            Err(e) => return Err(StorageError::from_io_with_path(&e, &object)),
        }

        let path = self.tags_path(target)?;
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            // an untagged object has an empty tag set
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::from_io_with_path(&e, &path)),
        };

        let sidecar: TagSidecar =
            serde_json::from_slice(&raw).map_err(|e| StorageError::CorruptedData {
                message: format!("{}: {e}", path.display()),
            })?;
        Ok(sidecar.tags)
    }

    async fn stream_upload(
        &self,
        request: UploadRequest,
        mut body: UploadBody,
        progress: ProgressFn<'_>,
    ) -> Result<UploadReceipt, StorageError> {
        let target = &request.target;
        let object = self.object_path(target)?;
        let staging = self.staging_path(target)?;
        ensure_parent(&staging).await?;
        ensure_parent(&object).await?;

        let mut guard = StagingGuard::new(staging.clone());
        let mut file = fs::File::create(&staging)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, &staging))?;

        let mut parts = PartBuffer::new(request.part_size);
        while let Some(chunk) = body.next().await {
            for part in parts.push(chunk?) {
                file.write_all(&part)
                    .await
                    .map_err(|e| StorageError::from_io_with_path(&e, &staging))?;
                progress(parts.record(&part));
            }
        }
        if let Some(part) = parts.finish() {
            file.write_all(&part)
                .await
                .map_err(|e| StorageError::from_io_with_path(&e, &staging))?;
            progress(parts.record(&part));
        }

        file.flush()
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, &staging))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, &staging))?;
        drop(file);

        fs::rename(&staging, &object)
            .await
            .map_err(|e| StorageError::AtomicRenameFailed {
                message: format!("{}: {e}", object.display()),
            })?;
        guard.disarm();

        let receipt = parts.receipt();
        let sidecar = TagSidecar {
            tags: request.tags,
            sse: request.sse,
            size: receipt.bytes,
            updated_at: Utc::now(),
        };
        self.write_sidecar(target, &sidecar).await?;

        Ok(receipt)
    }
}

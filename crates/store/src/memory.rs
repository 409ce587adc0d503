//! In-process blob store

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use relsync_errors::StorageError;
use relsync_types::{MirrorTarget, ObjectTag};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::blob::{BlobStore, PartBuffer, ProgressFn, UploadBody, UploadReceipt, UploadRequest};

/// A stored object and its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub tags: Vec<ObjectTag>,
    pub sse: Option<String>,
}

/// `BlobStore` kept entirely in memory
///
/// Body and tags are swapped under one lock, so readers never observe a
/// new body with old tags.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<MirrorTarget, StoredObject>>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly
    pub async fn insert(&self, target: MirrorTarget, body: impl Into<Bytes>, tags: Vec<ObjectTag>) {
        self.objects.write().await.insert(
            target,
            StoredObject {
                body: body.into(),
                tags,
                sse: None,
            },
        );
    }

    /// Snapshot of an object, if present
    pub async fn get(&self, target: &MirrorTarget) -> Option<StoredObject> {
        self.objects.read().await.get(target).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read_object_tags(&self, target: &MirrorTarget) -> Result<Vec<ObjectTag>, StorageError> {
        self.objects
            .read()
            .await
            .get(target)
            .map(|object| object.tags.clone())
            .ok_or_else(|| StorageError::ObjectNotFound {
                container: target.container.clone(),
                key: target.object_key.clone(),
            })
    }

    async fn stream_upload(
        &self,
        request: UploadRequest,
        mut body: UploadBody,
        progress: ProgressFn<'_>,
    ) -> Result<UploadReceipt, StorageError> {
        let mut parts = PartBuffer::new(request.part_size);
        let mut assembled = bytes::BytesMut::new();

        while let Some(chunk) = body.next().await {
            for part in parts.push(chunk?) {
                assembled.extend_from_slice(&part);
                progress(parts.record(&part));
            }
        }
        if let Some(part) = parts.finish() {
            assembled.extend_from_slice(&part);
            progress(parts.record(&part));
        }

        self.objects.write().await.insert(
            request.target,
            StoredObject {
                body: assembled.freeze(),
                tags: request.tags,
                sse: request.sse,
            },
        );
        Ok(parts.receipt())
    }
}

//! Blob store port

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use relsync_errors::StorageError;
use relsync_types::{MirrorTarget, ObjectTag};

/// Default size of one upload part (8 MiB)
pub const DEFAULT_PART_SIZE: usize = 8 * 1024 * 1024;

/// Body fed into an upload
///
/// An `Err` item aborts the upload; nothing is committed.
pub type UploadBody = BoxStream<'static, Result<Bytes, StorageError>>;

/// Parameters of a streamed write
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub target: MirrorTarget,
    /// Tags that replace the object's tag set when the upload commits
    pub tags: Vec<ObjectTag>,
    /// Server-side encryption setting, passed through untouched
    pub sse: Option<String>,
    pub part_size: usize,
}

impl UploadRequest {
    #[must_use]
    pub fn new(target: MirrorTarget, tags: Vec<ObjectTag>) -> Self {
        Self {
            target,
            tags,
            sse: None,
            part_size: DEFAULT_PART_SIZE,
        }
    }

    #[must_use]
    pub fn with_sse(mut self, sse: Option<String>) -> Self {
        self.sse = sse;
        self
    }

    #[must_use]
    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(1);
        self
    }
}

/// Reported after each part is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// 1-based part index
    pub part_number: u32,
    pub part_bytes: u64,
    /// Total bytes written so far
    pub bytes_uploaded: u64,
}

/// Summary of a committed upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReceipt {
    pub bytes: u64,
    pub parts: u32,
}

/// Callback invoked with upload progress
pub type ProgressFn<'a> = &'a (dyn Fn(UploadProgress) + Send + Sync);

/// Durable key-addressed storage with per-object tags
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the tag set of an object without touching its body
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` if the object does not exist, or any storage failure.
    async fn read_object_tags(&self, target: &MirrorTarget) -> Result<Vec<ObjectTag>, StorageError>;

    /// Stream `body` into `request.target`, replacing body and tags
    ///
    /// The body is consumed incrementally; implementations hold at most one
    /// part in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the body yields an error or the write fails. A
    /// failed upload leaves the previous object in place.
    async fn stream_upload(
        &self,
        request: UploadRequest,
        body: UploadBody,
        progress: ProgressFn<'_>,
    ) -> Result<UploadReceipt, StorageError>;
}

/// Accumulates body chunks into fixed-size parts
#[derive(Debug)]
pub(crate) struct PartBuffer {
    buf: bytes::BytesMut,
    part_size: usize,
    parts: u32,
    total: u64,
}

impl PartBuffer {
    pub(crate) fn new(part_size: usize) -> Self {
        let part_size = part_size.max(1);
        Self {
            buf: bytes::BytesMut::with_capacity(part_size.min(DEFAULT_PART_SIZE)),
            part_size,
            parts: 0,
            total: 0,
        }
    }

    /// Append a chunk, returning every part that became full
    pub(crate) fn push(&mut self, mut chunk: Bytes) -> Vec<Bytes> {
        let mut full = Vec::new();
        while !chunk.is_empty() {
            let room = self.part_size - self.buf.len();
            let take = room.min(chunk.len());
            self.buf.extend_from_slice(&chunk.split_to(take));
            if self.buf.len() == self.part_size {
                full.push(self.buf.split().freeze());
            }
        }
        full
    }

    /// Remaining bytes as the final part, if any
    pub(crate) fn finish(&mut self) -> Option<Bytes> {
        if self.buf.is_empty() {
            None
        } else {
            Some(self.buf.split().freeze())
        }
    }

    /// Record a written part and build its progress report
    pub(crate) fn record(&mut self, part: &Bytes) -> UploadProgress {
        self.parts += 1;
        self.total += part.len() as u64;
        UploadProgress {
            part_number: self.parts,
            part_bytes: part.len() as u64,
            bytes_uploaded: self.total,
        }
    }

    pub(crate) fn receipt(&self) -> UploadReceipt {
        UploadReceipt {
            bytes: self.total,
            parts: self.parts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_split_across_chunks() {
        let mut parts = PartBuffer::new(4);
        assert!(parts.push(Bytes::from_static(b"ab")).is_empty());

        let full = parts.push(Bytes::from_static(b"cdefghij"));
        assert_eq!(full, vec![Bytes::from_static(b"abcd"), Bytes::from_static(b"efgh")]);
        for part in &full {
            parts.record(part);
        }

        let last = parts.finish().unwrap();
        assert_eq!(last, Bytes::from_static(b"ij"));
        let progress = parts.record(&last);
        assert_eq!(progress.part_number, 3);
        assert_eq!(progress.bytes_uploaded, 10);
        assert!(parts.finish().is_none());
    }

    #[test]
    fn test_zero_part_size_is_clamped() {
        let request = UploadRequest::new(
            MirrorTarget::from_parts(Some("c"), Some("k")).unwrap(),
            Vec::new(),
        )
        .with_part_size(0);
        assert_eq!(request.part_size, 1);
    }
}

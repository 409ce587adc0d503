//! Streaming copy from the artifact source into the blob store
//!
//! The download leg runs as its own task and feeds a bounded channel; the
//! upload leg consumes that channel as its body stream. A slow store fills
//! the channel and parks the download task, so at most `buffer_chunks`
//! chunks are held between the two legs.

use bytes::Bytes;
use futures::StreamExt;
use relsync_errors::{NetworkError, StorageError, TransferError};
use relsync_events::{EventEmitter, FailureContext, TransferEvent};
use relsync_net::{ArtifactSource, ByteStream};
use relsync_store::{BlobStore, UploadBody, UploadProgress, UploadRequest, DEFAULT_PART_SIZE};
use relsync_types::{MirrorTarget, ReleaseAsset};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Tuning for one transfer
#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Capacity of the pipe between download and upload, in chunks
    pub buffer_chunks: usize,
    /// Longest wait for a single chunk from the source
    pub chunk_timeout: Duration,
    pub part_size: usize,
    /// Server-side encryption, passed to the store as-is
    pub sse: Option<String>,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            buffer_chunks: 16,
            chunk_timeout: Duration::from_secs(30),
            part_size: DEFAULT_PART_SIZE,
            sse: None,
        }
    }
}

/// What a committed transfer wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    pub bytes: u64,
    pub parts: u32,
    pub duration: Duration,
}

/// Messages on the pipe between the two legs
enum Piped {
    Chunk(Bytes),
    Failed(NetworkError),
    Done,
}

/// Aborts the download task when the transfer is dropped
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Pipes a release asset into the blob store
#[derive(Clone)]
pub struct StreamTransfer {
    source: Arc<dyn ArtifactSource>,
    store: Arc<dyn BlobStore>,
    settings: TransferSettings,
}

impl std::fmt::Debug for StreamTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransfer")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl StreamTransfer {
    #[must_use]
    pub fn new(
        source: Arc<dyn ArtifactSource>,
        store: Arc<dyn BlobStore>,
        settings: TransferSettings,
    ) -> Self {
        Self {
            source,
            store,
            settings,
        }
    }

    /// Copy `asset` into `target` and tag it with the asset name
    ///
    /// Dropping the returned future aborts both legs; the store discards
    /// the partial upload.
    ///
    /// # Errors
    ///
    /// `Download` when the source fails or stalls, `Upload` when the store
    /// rejects the write, `TaskFailed` if the download task dies.
    pub async fn mirror<E>(
        &self,
        target: &MirrorTarget,
        asset: &ReleaseAsset,
        emitter: &E,
    ) -> Result<TransferReport, TransferError>
    where
        E: EventEmitter + Sync,
    {
        let uploaded = AtomicU64::new(0);
        let result = self.pipe(target, asset, emitter, &uploaded).await;

        if let Err(err) = &result {
            emitter.emit_transfer(TransferEvent::Failed {
                target: target.clone(),
                bytes_transferred: uploaded.load(Ordering::Relaxed),
                failure: FailureContext::from_error(err),
            });
        }
        result
    }

    async fn pipe<E>(
        &self,
        target: &MirrorTarget,
        asset: &ReleaseAsset,
        emitter: &E,
        uploaded: &AtomicU64,
    ) -> Result<TransferReport, TransferError>
    where
        E: EventEmitter + Sync,
    {
        let start = Instant::now();
        let opened = self
            .source
            .open(&asset.download_url)
            .await
            .map_err(TransferError::Download)?;
        let total_bytes = opened.content_length;

        emitter.emit_transfer(TransferEvent::Started {
            url: asset.download_url.clone(),
            target: target.clone(),
            total_bytes,
        });

        let (tx, rx) = mpsc::channel(self.settings.buffer_chunks.max(1));
        let _download = AbortOnDrop(tokio::spawn(download_leg(
            opened.body,
            tx,
            self.settings.chunk_timeout,
            asset.download_url.clone(),
        )));

        let failure = Arc::new(Mutex::new(None));
        let body = upload_body(rx, target.clone(), Arc::clone(&failure));

        let request = UploadRequest::new(target.clone(), asset.version_tags())
            .with_sse(self.settings.sse.clone())
            .with_part_size(self.settings.part_size);

        let progress = |p: UploadProgress| {
            uploaded.store(p.bytes_uploaded, Ordering::Relaxed);
            emitter.emit_transfer(TransferEvent::PartUploaded {
                target: target.clone(),
                part_number: p.part_number,
                part_bytes: p.part_bytes,
            });
            emitter.emit_transfer(TransferEvent::Progress {
                target: target.clone(),
                bytes_uploaded: p.bytes_uploaded,
                total_bytes,
            });
        };

        let receipt = match self.store.stream_upload(request, body, &progress).await {
            Ok(receipt) => receipt,
            Err(err) => {
                let cause = failure.lock().ok().and_then(|mut slot| slot.take());
                return Err(cause.unwrap_or(TransferError::Upload(err)));
            }
        };

        let duration = start.elapsed();
        emitter.emit_transfer(TransferEvent::Completed {
            target: target.clone(),
            bytes: receipt.bytes,
            duration,
        });

        Ok(TransferReport {
            bytes: receipt.bytes,
            parts: receipt.parts,
            duration,
        })
    }
}

/// Read the source and push chunks until it ends, fails or the upload goes away
async fn download_leg(
    mut body: ByteStream,
    tx: mpsc::Sender<Piped>,
    chunk_timeout: Duration,
    url: String,
) {
    loop {
        let next = match tokio::time::timeout(chunk_timeout, body.next()).await {
            Ok(next) => next,
            Err(_) => Some(Err(NetworkError::Timeout { url: url.clone() })),
        };

        let message = match next {
            Some(Ok(chunk)) if chunk.is_empty() => continue,
            Some(Ok(chunk)) => Piped::Chunk(chunk),
            Some(Err(err)) => {
                let _ = tx.send(Piped::Failed(err)).await;
                return;
            }
            None => {
                let _ = tx.send(Piped::Done).await;
                return;
            }
        };

        if tx.send(message).await.is_err() {
            // upload side is gone
            return;
        }
    }
}

/// Adapt the pipe into an upload body
///
/// The body only ends cleanly on `Done`. A download failure or a closed pipe
/// becomes an error item so the store never commits a truncated object; the
/// real cause is parked in `failure`.
fn upload_body(
    rx: mpsc::Receiver<Piped>,
    target: MirrorTarget,
    failure: Arc<Mutex<Option<TransferError>>>,
) -> UploadBody {
    futures::stream::unfold(Some(rx), move |state| {
        let target = target.clone();
        let failure = Arc::clone(&failure);
        async move {
            let mut rx = state?;
            let cause = match rx.recv().await {
                Some(Piped::Chunk(chunk)) => return Some((Ok(chunk), Some(rx))),
                Some(Piped::Done) => return None,
                Some(Piped::Failed(err)) => TransferError::Download(err),
                None => TransferError::TaskFailed {
                    message: "download task ended without finishing".to_string(),
                },
            };

            let aborted = StorageError::UploadAborted {
                container: target.container.clone(),
                key: target.object_key.clone(),
                reason: cause.to_string(),
            };
            if let Ok(mut slot) = failure.lock() {
                *slot = Some(cause);
            }
            Some((Err(aborted), None))
        }
    })
    .boxed()
}

//! Integration tests for ops crate
//!
//! The three ports are replaced by instrumented fakes that count calls. The
//! fake store also measures how many chunks the source produced that the
//! store had not yet consumed.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream::{self, StreamExt};
    use relsync_config::Config;
    use relsync_errors::{NetworkError, ResolveError, StorageError, SyncError, TransferError};
    use relsync_events::{
        AppEvent, CacheLookupKind, EventLevel, EventMessage, EventReceiver, SyncEvent,
        TransferEvent,
    };
    use relsync_net::{ArtifactSource, ReleaseFeed, SourceStream};
    use relsync_ops::*;
    use relsync_store::{
        BlobStore, MemoryBlobStore, ProgressFn, UploadBody, UploadReceipt, UploadRequest,
    };
    use relsync_types::{MirrorTarget, ObjectTag, Release, ReleaseAsset, SyncDecision, SyncOutcome};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const ASSET: &str = "actions-runner-linux-x64-2.296.2.tar.gz";
    const URL: &str = "https://example.com/actions-runner-linux-x64-2.296.2.tar.gz";

    #[derive(Default)]
    struct Counters {
        feed_calls: AtomicUsize,
        tag_reads: AtomicUsize,
        opens: AtomicUsize,
        uploads: AtomicUsize,
        produced: AtomicUsize,
        consumed: AtomicUsize,
        max_outstanding: AtomicUsize,
    }

    impl Counters {
        fn get(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }
    }

    enum FeedBehavior {
        Release(Release),
        Fail(NetworkError),
        Hang,
    }

    struct FakeFeed {
        behavior: FeedBehavior,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl ReleaseFeed for FakeFeed {
        async fn latest_release(&self, _repository: &str) -> Result<Release, NetworkError> {
            self.counters.feed_calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                FeedBehavior::Release(release) => Ok(release.clone()),
                FeedBehavior::Fail(err) => Err(err.clone()),
                FeedBehavior::Hang => futures::future::pending().await,
            }
        }
    }

    #[derive(Clone, Copy)]
    enum SourceEnd {
        Finish,
        Fail,
        Stall,
    }

    struct FakeSource {
        chunks: usize,
        chunk_size: usize,
        end: SourceEnd,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl ArtifactSource for FakeSource {
        async fn open(&self, _url: &str) -> Result<SourceStream, NetworkError> {
            self.counters.opens.fetch_add(1, Ordering::SeqCst);
            let counters = self.counters.clone();
            let size = self.chunk_size;

            let body = stream::iter(0..self.chunks).map(move |_| {
                counters.produced.fetch_add(1, Ordering::SeqCst);
                Ok(Bytes::from(vec![b'x'; size]))
            });

            let body = match self.end {
                SourceEnd::Finish => body.boxed(),
                SourceEnd::Fail => body
                    .chain(stream::once(async {
                        Err(NetworkError::DownloadFailed("connection reset".into()))
                    }))
                    .boxed(),
                SourceEnd::Stall => body.chain(stream::pending()).boxed(),
            };

            Ok(SourceStream {
                content_length: None,
                body,
            })
        }
    }

    struct CountingStore {
        inner: MemoryBlobStore,
        tag_error: Option<StorageError>,
        consume_delay: Duration,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl BlobStore for CountingStore {
        async fn read_object_tags(
            &self,
            target: &MirrorTarget,
        ) -> Result<Vec<ObjectTag>, StorageError> {
            self.counters.tag_reads.fetch_add(1, Ordering::SeqCst);
            match &self.tag_error {
                Some(err) => Err(err.clone()),
                None => self.inner.read_object_tags(target).await,
            }
        }

        async fn stream_upload(
            &self,
            request: UploadRequest,
            body: UploadBody,
            progress: ProgressFn<'_>,
        ) -> Result<UploadReceipt, StorageError> {
            self.counters.uploads.fetch_add(1, Ordering::SeqCst);
            let counters = self.counters.clone();
            let delay = self.consume_delay;

            let measured = body
                .then(move |item| {
                    let counters = counters.clone();
                    async move {
                        let consumed = counters.consumed.fetch_add(1, Ordering::SeqCst);
                        let outstanding = Counters::get(&counters.produced).saturating_sub(consumed);
                        counters
                            .max_outstanding
                            .fetch_max(outstanding, Ordering::SeqCst);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        item
                    }
                })
                .boxed();

            self.inner.stream_upload(request, measured, progress).await
        }
    }

    struct Harness {
        counters: Arc<Counters>,
        memory: MemoryBlobStore,
        config: Config,
        feed: FeedBehavior,
        source_chunks: usize,
        source_end: SourceEnd,
        tag_error: Option<StorageError>,
        consume_delay: Duration,
    }

    impl Harness {
        fn new() -> Self {
            let mut config = Config::default();
            config.target.container = Some("mirror".into());
            config.target.object_key = Some("runner.tar.gz".into());
            config.store.part_size = 1024;

            Self {
                counters: Arc::new(Counters::default()),
                memory: MemoryBlobStore::new(),
                config,
                feed: FeedBehavior::Release(release(&[
                    ASSET,
                    "actions-runner-osx-x64-2.296.2.tar.gz",
                ])),
                source_chunks: 4,
                source_end: SourceEnd::Finish,
                tag_error: None,
                consume_delay: Duration::ZERO,
            }
        }

        fn context(self) -> (OpsCtx, Arc<Counters>, MemoryBlobStore, EventReceiver) {
            let (tx, rx) = relsync_events::channel();
            let feed = Arc::new(FakeFeed {
                behavior: self.feed,
                counters: self.counters.clone(),
            });
            let source = Arc::new(FakeSource {
                chunks: self.source_chunks,
                chunk_size: 256,
                end: self.source_end,
                counters: self.counters.clone(),
            });
            let store = Arc::new(CountingStore {
                inner: self.memory.clone(),
                tag_error: self.tag_error,
                consume_delay: self.consume_delay,
                counters: self.counters.clone(),
            });

            let ctx = OpsContextBuilder::new()
                .with_feed(feed)
                .with_source(source)
                .with_store(store)
                .with_event_sender(tx)
                .with_config(self.config)
                .build()
                .unwrap();
            (ctx, self.counters, self.memory, rx)
        }
    }

    fn release(names: &[&str]) -> Release {
        Release {
            version_tag: "v2.296.2".into(),
            assets: names
                .iter()
                .map(|n| ReleaseAsset::new(*n, format!("https://example.com/{n}")))
                .collect(),
        }
    }

    fn target() -> MirrorTarget {
        MirrorTarget::from_parts(Some("mirror"), Some("runner.tar.gz")).unwrap()
    }

    fn drain(rx: &mut EventReceiver) -> Vec<EventMessage> {
        let mut events = Vec::new();
        while let Ok(message) = rx.try_recv() {
            events.push(message);
        }
        events
    }

    #[tokio::test]
    async fn test_missing_target_fields_short_circuit() {
        for (container, key) in [(Some("mirror"), None), (None, Some("runner.tar.gz")), (None, None)] {
            let mut harness = Harness::new();
            harness.config.target.container = container.map(String::from);
            harness.config.target.object_key = key.map(String::from);
            let (ctx, counters, _, _rx) = harness.context();

            let err = sync(&ctx).await.unwrap_err();
            assert!(matches!(err, SyncError::Configuration(_)));

            let err = status(&ctx).await.unwrap_err();
            assert!(matches!(err, SyncError::Configuration(_)));

            assert_eq!(Counters::get(&counters.feed_calls), 0);
            assert_eq!(Counters::get(&counters.tag_reads), 0);
            assert_eq!(Counters::get(&counters.opens), 0);
        }
    }

    #[tokio::test]
    async fn test_absent_tag_transfers_once_with_name_tag() {
        let (ctx, counters, memory, _rx) = Harness::new().context();

        let outcome = sync(&ctx).await.unwrap();

        match &outcome {
            SyncOutcome::Updated {
                asset,
                previous_tag,
                bytes,
                ..
            } => {
                assert_eq!(asset.name, ASSET);
                assert_eq!(asset.download_url, URL);
                assert!(previous_tag.is_none());
                assert_eq!(*bytes, 4 * 256);
            }
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(Counters::get(&counters.uploads), 1);
        assert_eq!(Counters::get(&counters.opens), 1);

        let stored = memory.get(&target()).await.unwrap();
        assert_eq!(stored.tags, vec![ObjectTag::new("name", ASSET)]);
        assert_eq!(stored.body.len(), 4 * 256);
    }

    #[tokio::test]
    async fn test_equal_tag_skips_transfer() {
        let harness = Harness::new();
        harness
            .memory
            .insert(target(), "mirrored", vec![ObjectTag::new("name", ASSET)])
            .await;
        let (ctx, counters, memory, _rx) = harness.context();

        let outcome = sync(&ctx).await.unwrap();

        assert!(!outcome.is_updated());
        assert_eq!(Counters::get(&counters.uploads), 0);
        assert_eq!(Counters::get(&counters.opens), 0);
        assert_eq!(memory.get(&target()).await.unwrap().body, Bytes::from_static(b"mirrored"));
    }

    #[tokio::test]
    async fn test_unrelated_tag_key_is_stale() {
        let harness = Harness::new();
        harness
            .memory
            .insert(target(), "old", vec![ObjectTag::new("owner", ASSET)])
            .await;
        let (ctx, counters, memory, _rx) = harness.context();

        assert!(sync(&ctx).await.unwrap().is_updated());
        assert_eq!(Counters::get(&counters.uploads), 1);
        assert_eq!(
            memory.get(&target()).await.unwrap().tags,
            vec![ObjectTag::new("name", ASSET)]
        );
    }

    #[tokio::test]
    async fn test_renamed_asset_with_same_version_is_stale() {
        let harness = Harness::new();
        harness
            .memory
            .insert(
                target(),
                "old",
                vec![ObjectTag::new("name", "actions-runner-linux-x64-2.296.2.tgz")],
            )
            .await;
        let (ctx, counters, _, _rx) = harness.context();

        match sync(&ctx).await.unwrap() {
            SyncOutcome::Updated { previous_tag, .. } => assert_eq!(
                previous_tag.as_deref(),
                Some("actions-runner-linux-x64-2.296.2.tgz")
            ),
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(Counters::get(&counters.uploads), 1);
    }

    #[tokio::test]
    async fn test_cache_read_error_behaves_like_a_miss() {
        let mut harness = Harness::new();
        harness.tag_error = Some(StorageError::PermissionDenied {
            path: "mirror/runner.tar.gz".into(),
        });
        let (ctx, counters, _, mut rx) = harness.context();

        assert!(sync(&ctx).await.unwrap().is_updated());
        assert_eq!(Counters::get(&counters.uploads), 1);

        let warned = drain(&mut rx).into_iter().any(|m| {
            matches!(
                m.event,
                AppEvent::Sync(SyncEvent::CacheChecked {
                    lookup: CacheLookupKind::Unreadable,
                    ..
                })
            ) && m.meta.level == EventLevel::Warn
        });
        assert!(warned, "unreadable cache should be reported as a warning");
    }

    #[tokio::test]
    async fn test_ambiguous_tags_force_sync() {
        let harness = Harness::new();
        harness
            .memory
            .insert(
                target(),
                "old",
                vec![ObjectTag::new("name", ASSET), ObjectTag::new("name", ASSET)],
            )
            .await;
        let (ctx, counters, _, _rx) = harness.context();

        let plan = status(&ctx).await.unwrap();
        assert_eq!(plan.cache_lookup, "ambiguous");
        assert!(plan.cached_tag.is_none());

        assert!(sync(&ctx).await.unwrap().is_updated());
        assert_eq!(Counters::get(&counters.uploads), 1);
    }

    #[tokio::test]
    async fn test_zero_and_multiple_matches_fail_alike() {
        let releases = [
            release(&["actions-runner-osx-x64-2.296.2.tar.gz"]),
            release(&[ASSET, "actions-runner-linux-x64-2.296.2.zip"]),
            release(&[]),
        ];

        for release in releases {
            let mut harness = Harness::new();
            harness.feed = FeedBehavior::Release(release);
            let (ctx, counters, memory, _rx) = harness.context();

            let err = sync(&ctx).await.unwrap_err();
            match err {
                SyncError::AssetResolution(inner) => assert!(inner.is_not_found()),
                other => panic!("expected asset resolution error, got {other:?}"),
            }
            assert_eq!(Counters::get(&counters.uploads), 0);
            assert!(memory.is_empty().await);
        }
    }

    #[tokio::test]
    async fn test_feed_error_is_asset_resolution() {
        let mut harness = Harness::new();
        harness.feed = FeedBehavior::Fail(NetworkError::RateLimited { seconds: 60 });
        let (ctx, counters, _, _rx) = harness.context();

        let err = sync(&ctx).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::AssetResolution(ResolveError::Feed(NetworkError::RateLimited { .. }))
        ));
        assert_eq!(Counters::get(&counters.feed_calls), 1);
        assert_eq!(Counters::get(&counters.uploads), 0);
    }

    #[tokio::test]
    async fn test_transfer_memory_is_bounded_by_buffer() {
        let mut harness = Harness::new();
        harness.config.transfer.buffer_chunks = 4;
        harness.source_chunks = 200;
        harness.consume_delay = Duration::from_millis(1);
        let (ctx, counters, memory, _rx) = harness.context();

        let outcome = sync(&ctx).await.unwrap();
        assert!(outcome.is_updated());

        assert_eq!(Counters::get(&counters.produced), 200);
        assert_eq!(memory.get(&target()).await.unwrap().body.len(), 200 * 256);

        // channel capacity plus the chunk held by each leg
        let max = Counters::get(&counters.max_outstanding);
        assert!(max <= 4 + 2, "{max} chunks were buffered");
    }

    #[tokio::test]
    async fn test_download_failure_keeps_previous_object() {
        let mut harness = Harness::new();
        harness.source_end = SourceEnd::Fail;
        harness
            .memory
            .insert(target(), "previous", vec![ObjectTag::new("name", "older")])
            .await;
        let (ctx, _, memory, _rx) = harness.context();

        let err = sync(&ctx).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Transfer(TransferError::Download(NetworkError::DownloadFailed(_)))
        ));

        let stored = memory.get(&target()).await.unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"previous"));
        assert_eq!(stored.tags, vec![ObjectTag::new("name", "older")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_transfer() {
        let mut harness = Harness::new();
        harness.source_end = SourceEnd::Stall;
        harness.config.transfer.deadline = 5;
        harness.config.transfer.chunk_timeout = 600;
        let (ctx, _, memory, mut rx) = harness.context();

        let err = sync(&ctx).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Transfer(TransferError::DeadlineExceeded { seconds: 5 })
        ));
        assert!(memory.is_empty().await);
        assert!(drain(&mut rx)
            .iter()
            .any(|m| matches!(m.event, AppEvent::Transfer(TransferEvent::Aborted { .. }))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_source_hits_chunk_timeout() {
        let mut harness = Harness::new();
        harness.source_end = SourceEnd::Stall;
        harness.config.transfer.deadline = 600;
        harness.config.transfer.chunk_timeout = 2;
        let (ctx, _, _, _rx) = harness.context();

        let err = sync(&ctx).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Transfer(TransferError::Download(NetworkError::Timeout { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_while_resolving() {
        let mut harness = Harness::new();
        harness.feed = FeedBehavior::Hang;
        harness.config.transfer.deadline = 3;
        let (ctx, counters, _, _rx) = harness.context();

        let err = sync(&ctx).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::AssetResolution(ResolveError::Feed(NetworkError::Timeout { .. }))
        ));
        assert_eq!(Counters::get(&counters.uploads), 0);
    }

    #[tokio::test]
    async fn test_status_reports_without_writing() {
        let (ctx, counters, memory, _rx) = Harness::new().context();

        let plan = status(&ctx).await.unwrap();
        assert_eq!(plan.cache_lookup, "missing");
        assert!(matches!(plan.decision, SyncDecision::Stale(ref a) if a.name == ASSET));
        assert_eq!(Counters::get(&counters.uploads), 0);
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_largest_configurable_deadline_does_not_panic() {
        let mut harness = Harness::new();
        // largest integer TOML can express
        harness.config.transfer.deadline = i64::MAX as u64;
        assert!(harness.config.validate().is_ok());
        let (ctx, counters, memory, _rx) = harness.context();

        let plan = status(&ctx).await.unwrap();
        assert!(matches!(plan.decision, SyncDecision::Stale(_)));

        assert!(sync(&ctx).await.unwrap().is_updated());
        assert_eq!(Counters::get(&counters.uploads), 1);
        assert_eq!(memory.len().await, 1);
    }

    #[tokio::test]
    async fn test_sse_setting_reaches_the_store() {
        let mut harness = Harness::new();
        harness.config.store.sse = Some("aws:kms".to_string());
        let (ctx, _, memory, _rx) = harness.context();

        assert!(sync(&ctx).await.unwrap().is_updated());

        let stored = memory.get(&target()).await.unwrap();
        assert_eq!(stored.sse.as_deref(), Some("aws:kms"));
    }

    #[tokio::test]
    async fn test_status_reports_unknown_asset() {
        let mut harness = Harness::new();
        harness.feed = FeedBehavior::Fail(NetworkError::NetworkUnavailable);
        let (ctx, _, _, _rx) = harness.context();

        let plan = status(&ctx).await.unwrap();
        assert_eq!(plan.decision, SyncDecision::UnknownAsset);
        assert!(plan.asset.is_none());
        assert!(plan.resolve_error.is_some());
    }

    #[tokio::test]
    async fn test_events_share_correlation_id() {
        let (ctx, _, _, mut rx) = Harness::new().context();
        sync(&ctx).await.unwrap();

        let events = drain(&mut rx);
        assert!(!events.is_empty());
        let first = events[0].meta.correlation_id.clone();
        assert!(first.is_some());
        assert!(events.iter().all(|m| m.meta.correlation_id == first));
        assert!(events
            .iter()
            .any(|m| matches!(m.event, AppEvent::Sync(SyncEvent::Updated { .. }))));
    }

    mod end_to_end {
        use super::*;
        use httpmock::prelude::*;
        use relsync_net::ClientCache;
        use relsync_store::FsBlobStore;
        use serde_json::json;
        use tempfile::tempdir;

        #[tokio::test]
        async fn test_sync_against_http_feed_and_fs_store() {
            let server = MockServer::start();
            let payload = vec![42u8; 100_000];

            server.mock(|when, then| {
                when.method(GET).path("/repos/actions/runner/releases/latest");
                then.status(200).json_body(json!({
                    "tag_name": "v2.296.2",
                    "assets": [{
                        "name": ASSET,
                        "browser_download_url": server.url("/download/runner.tar.gz")
                    }]
                }));
            });
            let download = server.mock(|when, then| {
                when.method(GET).path("/download/runner.tar.gz");
                then.status(200).body(payload.clone());
            });

            let temp = tempdir().unwrap();
            let mut config = Config::default();
            config.target.container = Some("mirror".into());
            config.target.object_key = Some("runner.tar.gz".into());
            config.feed.api_url = server.base_url();
            config.store.root = Some(temp.path().to_path_buf());
            config.store.part_size = 16 * 1024;

            let clients = Arc::new(ClientCache::with_config(net_config(&config)));
            let (tx, _rx) = relsync_events::channel();
            let ctx = OpsContextBuilder::new()
                .with_event_sender(tx)
                .with_config(config)
                .with_client_cache(clients)
                .with_store(Arc::new(FsBlobStore::new(temp.path())))
                .build()
                .unwrap();

            let first = sync(&ctx).await.unwrap();
            assert!(first.is_updated());
            let written = std::fs::read(temp.path().join("mirror/runner.tar.gz")).unwrap();
            assert_eq!(written, payload);

            let second = sync(&ctx).await.unwrap();
            assert!(!second.is_updated());
            download.assert_hits(1);
        }
    }
}

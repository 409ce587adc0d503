//! Integration tests for store crate

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::stream::{self, StreamExt};
    use relsync_errors::StorageError;
    use relsync_store::*;
    use relsync_types::{MirrorTarget, ObjectTag};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    fn target() -> MirrorTarget {
        MirrorTarget::from_parts(Some("mirror"), Some("runner.tar.gz")).unwrap()
    }

    fn body_of(chunks: Vec<&'static [u8]>) -> UploadBody {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c)))).boxed()
    }

    fn staging_entries(root: &std::path::Path) -> usize {
        std::fs::read_dir(root.join("mirror").join(".staging"))
            .map(|rd| rd.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_fs_upload_writes_body_and_tags() {
        let temp = tempdir().unwrap();
        let store = FsBlobStore::new(temp.path());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress = move |p: UploadProgress| sink.lock().unwrap().push(p);

        let request = UploadRequest::new(
            target(),
            vec![ObjectTag::new("name", "actions-runner-linux-x64-2.296.2.tar.gz")],
        )
        .with_sse(Some("aws:kms".into()))
        .with_part_size(4);

        let receipt = store
            .stream_upload(request, body_of(vec![b"hello ", b"world"]), &progress)
            .await
            .unwrap();

        assert_eq!(receipt.bytes, 11);
        assert_eq!(receipt.parts, 3);

        let written = std::fs::read(temp.path().join("mirror/runner.tar.gz")).unwrap();
        assert_eq!(written, b"hello world");

        let tags = store.read_object_tags(&target()).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].value, "actions-runner-linux-x64-2.296.2.tar.gz");

        let sidecar: serde_json::Value = serde_json::from_slice(
            &std::fs::read(temp.path().join("mirror/.tags/runner.tar.gz.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(sidecar["sse"], "aws:kms");

        let parts: Vec<u32> = seen.lock().unwrap().iter().map(|p| p.part_number).collect();
        assert_eq!(parts, vec![1, 2, 3]);
        assert_eq!(staging_entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_fs_failed_upload_keeps_previous_object() {
        let temp = tempdir().unwrap();
        let store = FsBlobStore::new(temp.path());
        let noop = |_: UploadProgress| {};

        store
            .stream_upload(
                UploadRequest::new(target(), vec![ObjectTag::new("name", "old")]),
                body_of(vec![b"old body"]),
                &noop,
            )
            .await
            .unwrap();

        let failing: UploadBody = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(StorageError::UploadAborted {
                container: "mirror".into(),
                key: "runner.tar.gz".into(),
                reason: "source failed".into(),
            }),
        ])
        .boxed();

        let err = store
            .stream_upload(
                UploadRequest::new(target(), vec![ObjectTag::new("name", "new")]),
                failing,
                &noop,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UploadAborted { .. }));

        let written = std::fs::read(temp.path().join("mirror/runner.tar.gz")).unwrap();
        assert_eq!(written, b"old body");
        let tags = store.read_object_tags(&target()).await.unwrap();
        assert_eq!(tags[0].value, "old");
        assert_eq!(staging_entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_fs_missing_object_and_untagged_object() {
        let temp = tempdir().unwrap();
        let store = FsBlobStore::new(temp.path());

        let err = store.read_object_tags(&target()).await.unwrap_err();
        assert!(matches!(err, StorageError::ObjectNotFound { .. }));

        std::fs::create_dir_all(temp.path().join("mirror")).unwrap();
        std::fs::write(temp.path().join("mirror/runner.tar.gz"), b"x").unwrap();
        assert!(store.read_object_tags(&target()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fs_corrupt_sidecar_is_unreadable_in_cache() {
        let temp = tempdir().unwrap();
        let store = FsBlobStore::new(temp.path());
        std::fs::create_dir_all(temp.path().join("mirror/.tags")).unwrap();
        std::fs::write(temp.path().join("mirror/runner.tar.gz"), b"x").unwrap();
        std::fs::write(temp.path().join("mirror/.tags/runner.tar.gz.json"), b"{oops").unwrap();

        let cache = VersionCache::new(Arc::new(store));
        let lookup = cache.lookup(&target()).await;
        assert!(matches!(
            lookup,
            TagLookup::Unreadable(StorageError::CorruptedData { .. })
        ));
        assert!(cache.read_current_tag(&target()).await.is_none());
    }

    #[tokio::test]
    async fn test_memory_store_replaces_body_and_tags_together() {
        let store = MemoryBlobStore::new();
        store
            .insert(target(), "old", vec![ObjectTag::new("name", "old")])
            .await;

        let noop = |_: UploadProgress| {};
        store
            .stream_upload(
                UploadRequest::new(target(), vec![ObjectTag::new("name", "new")])
                    .with_sse(Some("AES256".into())),
                body_of(vec![b"new ", b"body"]),
                &noop,
            )
            .await
            .unwrap();

        let object = store.get(&target()).await.unwrap();
        assert_eq!(object.body, Bytes::from_static(b"new body"));
        assert_eq!(object.tags, vec![ObjectTag::new("name", "new")]);
        assert_eq!(object.sse.as_deref(), Some("AES256"));
        assert_eq!(store.len().await, 1);
    }
}

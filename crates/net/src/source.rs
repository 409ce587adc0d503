//! Artifact download port

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use relsync_errors::NetworkError;
use std::sync::Arc;
use url::Url;

use crate::cache::ClientCache;
use crate::client::{classify_error, ensure_success};

/// Fallible stream of body chunks
pub type ByteStream = BoxStream<'static, Result<Bytes, NetworkError>>;

/// An opened download
pub struct SourceStream {
    /// Length advertised by the server, if any
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl std::fmt::Debug for SourceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Something that can open a byte stream for an asset URL
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Open `url` for streaming
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is unusable or the server rejects the request.
    async fn open(&self, url: &str) -> Result<SourceStream, NetworkError>;
}

/// Check that a download URL parses and uses a supported scheme
///
/// # Errors
///
/// Returns `InvalidUrl` or `UnsupportedProtocol`.
pub fn validate_url(url: &str) -> Result<Url, NetworkError> {
    let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(NetworkError::UnsupportedProtocol {
            protocol: scheme.to_string(),
        }),
    }
}

/// `ArtifactSource` that streams over HTTP(S)
///
/// Clients are taken from the cache per URL origin.
#[derive(Debug, Clone)]
pub struct HttpArtifactSource {
    clients: Arc<ClientCache>,
}

impl HttpArtifactSource {
    #[must_use]
    pub fn new(clients: Arc<ClientCache>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl ArtifactSource for HttpArtifactSource {
    async fn open(&self, url: &str) -> Result<SourceStream, NetworkError> {
        let parsed = validate_url(url)?;
        let client = self
            .clients
            .get_or_create(&parsed.origin().ascii_serialization(), None)?;
        let response = client.get(parsed.as_str()).await?;
        ensure_success(&response)?;

        let content_length = response.content_length();
        let owned_url = url.to_string();
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| classify_error(&e, &owned_url)))
            .boxed();

        Ok(SourceStream {
            content_length,
            body,
        })
    }
}

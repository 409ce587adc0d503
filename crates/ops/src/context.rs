//! Operations context for dependency injection

use relsync_config::Config;
use relsync_errors::Error;
use relsync_events::EventSender;
use relsync_net::{
    ArtifactSource, ClientCache, GithubReleaseFeed, HttpArtifactSource, NetConfig, ReleaseFeed,
};
use relsync_store::{BlobStore, FsBlobStore};
use std::sync::Arc;
use std::time::Duration;

/// Operations context providing access to all sync collaborators
#[derive(Clone)]
pub struct OpsCtx {
    /// Release feed the resolver queries
    pub feed: Arc<dyn ReleaseFeed>,
    /// Download side of a transfer
    pub source: Arc<dyn ArtifactSource>,
    /// Mirror destination
    pub store: Arc<dyn BlobStore>,
    /// Event sender for progress reporting
    pub tx: EventSender,
    /// Effective configuration
    pub config: Config,
}

impl std::fmt::Debug for OpsCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpsCtx")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Translate the `[network]` section into client settings
#[must_use]
pub fn net_config(config: &Config) -> NetConfig {
    NetConfig {
        timeout: Duration::from_secs(config.network.timeout),
        connect_timeout: Duration::from_secs(config.network.connect_timeout),
        ..NetConfig::default()
    }
}

/// Builder for operations context
///
/// Collaborators that are not supplied explicitly are derived from the
/// configuration: the GitHub feed and HTTP source draw their clients from
/// the client cache, and the store defaults to the filesystem store.
pub struct OpsContextBuilder {
    feed: Option<Arc<dyn ReleaseFeed>>,
    source: Option<Arc<dyn ArtifactSource>>,
    store: Option<Arc<dyn BlobStore>>,
    clients: Option<Arc<ClientCache>>,
    tx: Option<EventSender>,
    config: Option<Config>,
}

impl OpsContextBuilder {
    /// Create new context builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            feed: None,
            source: None,
            store: None,
            clients: None,
            tx: None,
            config: None,
        }
    }

    /// Set release feed
    #[must_use]
    pub fn with_feed(mut self, feed: Arc<dyn ReleaseFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Set artifact source
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn ArtifactSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set blob store
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the client cache used for default network collaborators
    #[must_use]
    pub fn with_client_cache(mut self, clients: Arc<ClientCache>) -> Self {
        self.clients = Some(clients);
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Set configuration
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if a required component is missing or a network
    /// client cannot be created.
    pub fn build(self) -> Result<OpsCtx, Error> {
        let tx = self.tx.ok_or_else(|| missing("event_sender"))?;
        let config = self.config.ok_or_else(|| missing("config"))?;

        let feed = match self.feed {
            Some(feed) => feed,
            None => {
                let clients = self.clients.as_ref().ok_or_else(|| missing("client_cache"))?;
                let token = config.feed.token.clone();
                let client = clients.get_or_create(&config.feed.api_url, token.as_deref())?;
                Arc::new(GithubReleaseFeed::new(client, config.feed.api_url.clone(), token))
                    as Arc<dyn ReleaseFeed>
            }
        };

        let source = match self.source {
            Some(source) => source,
            None => {
                let clients = self.clients.clone().ok_or_else(|| missing("client_cache"))?;
                Arc::new(HttpArtifactSource::new(clients)) as Arc<dyn ArtifactSource>
            }
        };

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(FsBlobStore::new(config.store_root())));

        Ok(OpsCtx {
            feed,
            source,
            store,
            tx,
            config,
        })
    }
}

impl Default for OpsContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(component: &str) -> Error {
    Error::internal(format!("missing component: {component}"))
}

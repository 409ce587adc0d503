//! Bounded cache of HTTP clients

use dashmap::DashMap;
use relsync_errors::NetworkError;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use crate::client::{NetClient, NetConfig};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    base_url: String,
    credential: Option<u64>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    client: NetClient,
    created_at: Instant,
}

/// Reuses `NetClient` handles across sync cycles.
///
/// Entries are keyed by base URL and a fingerprint of the credential, so a
/// rotated token never reuses a client built for the old one. Nothing is
/// process-global: the owner decides the lifetime.
#[derive(Debug)]
pub struct ClientCache {
    entries: DashMap<CacheKey, CacheEntry>,
    config: NetConfig,
    max_entries: usize,
    ttl: Duration,
}

impl ClientCache {
    pub const DEFAULT_MAX_ENTRIES: usize = 8;
    pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

    #[must_use]
    pub fn new(config: NetConfig, max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    /// Cache with the default bounds
    #[must_use]
    pub fn with_config(config: NetConfig) -> Self {
        Self::new(config, Self::DEFAULT_MAX_ENTRIES, Self::DEFAULT_TTL)
    }

    /// Return the cached client for `base_url`/`credential`, building one if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a new client cannot be constructed.
    pub fn get_or_create(
        &self,
        base_url: &str,
        credential: Option<&str>,
    ) -> Result<NetClient, NetworkError> {
        let key = CacheKey {
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: credential.map(fingerprint),
        };

        if let Some(entry) = self.entries.get(&key) {
            if entry.created_at.elapsed() < self.ttl {
                return Ok(entry.client.clone());
            }
        }
        self.entries.remove(&key);
        self.evict_expired();

        while self.entries.len() >= self.max_entries {
            if !self.evict_oldest() {
                break;
            }
        }

        let client = NetClient::new(&self.config)?;
        self.entries.insert(
            key,
            CacheEntry {
                client: client.clone(),
                created_at: Instant::now(),
            },
        );
        Ok(client)
    }

    /// Number of live entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.created_at.elapsed() < ttl);
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().created_at)
            .map(|entry| entry.key().clone());

        match oldest {
            Some(key) => self.entries.remove(&key).is_some(),
            None => false,
        }
    }
}

fn fingerprint(credential: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    credential.hash(&mut hasher);
    hasher.finish()
}

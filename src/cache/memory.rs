/// In-process cache backend with a bounded LRU and expiry on read
use super::{CacheError, CacheStore};
use async_trait::async_trait;
use lru::LruCache;
use std::{
    num::NonZeroUsize,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

/// Entry count used when no capacity is configured
pub const DEFAULT_CAPACITY: usize = 10_000;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// LRU-backed cache used when redis is disabled or unreachable, and in tests.
///
/// Holds at most `capacity` entries; the least recently used entry is evicted
/// on overflow. An entry found expired on read is removed.
pub struct MemoryCache {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Number of stored entries, including expired ones not yet read back
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        // LRU lookups reorder entries, so reads take the write lock
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        let found = entries
            .get(key)
            .map(|entry| (entry.expires_at > now).then(|| entry.value.clone()));

        match found {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                entries.pop(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.put(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Cache-aside layer for SkySkins
///
/// Stores rendered avatars and raw signed-texture documents for a fixed
/// 48 hours. The cache is an optimization only: read failures behave like
/// misses and write failures are logged and otherwise ignored.
///
/// Key layout: `<prefix><namespace>:<scope>`, e.g.
/// - `skin:avatar:mojang:069a79f444e94726a5befca90e38aaf5`
/// - `skin:avatar:all:069a79f444e94726a5befca90e38aaf5`
/// - `skin:texture-data:069a79f444e94726a5befca90e38aaf5`

pub mod memory;
pub mod redis_store;

pub use memory::MemoryCache;
pub use redis_store::RedisCache;

use crate::{identity::PlayerIdentifier, metrics, providers::SkinSource};
use async_trait::async_trait;
use std::{fmt, future::Future, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};

/// Time-to-live for every cached artifact
pub const CACHE_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// Cache key namespaces. Distinct purposes never share a namespace.
pub mod namespaces {
    pub const AVATAR: &str = "avatar";
    pub const TEXTURE_DATA: &str = "texture-data";
}

/// Cache layer configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Use redis; when false an in-process cache is used instead
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub redis_url: String,

    /// Key prefix for all cache entries (default: "skin:")
    pub key_prefix: String,

    /// Upper bound on a single redis round trip, in milliseconds
    pub operation_timeout_ms: u64,

    /// Entry limit for the in-process fallback cache
    pub memory_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "skin:".to_string(),
            operation_timeout_ms: 500,
            memory_capacity: memory::DEFAULT_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("CACHE_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.enabled),
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            key_prefix: std::env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            operation_timeout_ms: std::env::var("CACHE_OPERATION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.operation_timeout_ms),
            memory_capacity: std::env::var("CACHE_MEMORY_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.memory_capacity),
        }
    }
}

/// Cache backend failure. Never surfaced to API callers.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Byte-oriented cache backend
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a value; `Ok(None)` is a clean miss
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a value with an expiry
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Check backend connectivity
    async fn ping(&self) -> Result<(), CacheError>;

    /// Backend name for diagnostics
    fn backend(&self) -> &'static str;
}

/// Namespaced cache key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    namespace: &'static str,
    scope: String,
}

impl CacheKey {
    /// Rendered avatar from one provider
    pub fn avatar(source: SkinSource, player: &PlayerIdentifier) -> Self {
        Self {
            namespace: namespaces::AVATAR,
            scope: format!("{}:{}", source, player.canonical()),
        }
    }

    /// Rendered avatar from the all-providers chain
    pub fn aggregate_avatar(player: &PlayerIdentifier, username: Option<&PlayerIdentifier>) -> Self {
        let scope = match username {
            Some(name) => format!("all:{}:{}", player.canonical(), name.canonical()),
            None => format!("all:{}", player.canonical()),
        };
        Self {
            namespace: namespaces::AVATAR,
            scope,
        }
    }

    /// Raw signed-texture metadata document
    pub fn texture_data(player: &PlayerIdentifier) -> Self {
        Self {
            namespace: namespaces::TEXTURE_DATA,
            scope: player.canonical().to_string(),
        }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.scope)
    }
}

/// Cache-aside wrapper shared across requests
#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn CacheStore>,
    key_prefix: String,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    /// Build the backend cache layer described by `config`
    pub async fn from_config(config: &CacheConfig) -> Self {
        let store: Arc<dyn CacheStore> = if config.enabled {
            match RedisCache::connect(config).await {
                Ok(redis) => Arc::new(redis),
                Err(e) => {
                    warn!(error = %e, "redis unavailable, falling back to in-memory cache");
                    Arc::new(MemoryCache::new(config.memory_capacity))
                }
            }
        } else {
            Arc::new(MemoryCache::new(config.memory_capacity))
        };

        Self::new(store, config.key_prefix.clone())
    }

    fn build_key(&self, key: &CacheKey) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Read a value. Backend errors are logged and reported as a miss.
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let cache_key = self.build_key(key);

        match self.store.get(&cache_key).await {
            Ok(Some(bytes)) => {
                debug!("Cache HIT: {}", cache_key);
                metrics::record_cache_access(key.namespace(), true);
                Some(bytes)
            }
            Ok(None) => {
                debug!("Cache MISS: {}", cache_key);
                metrics::record_cache_access(key.namespace(), false);
                None
            }
            Err(e) => {
                warn!(key = %cache_key, error = %e, "cache read failed, treating as miss");
                metrics::record_cache_error("read");
                metrics::record_cache_access(key.namespace(), false);
                None
            }
        }
    }

    /// Write a value with the fixed TTL. Failures are logged only.
    pub async fn put(&self, key: &CacheKey, value: &[u8]) {
        let cache_key = self.build_key(key);

        match self.store.set(&cache_key, value, CACHE_TTL).await {
            Ok(()) => debug!("Cache SET: {} ({} bytes)", cache_key, value.len()),
            Err(e) => {
                warn!(key = %cache_key, error = %e, "failed to cache value");
                metrics::record_cache_error("write");
            }
        }
    }

    /// Return the cached value for `key`, or run `compute` and cache its result.
    ///
    /// `compute` is not invoked on a hit. Failed computations are never cached.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &CacheKey, compute: F) -> Result<Vec<u8>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok(cached);
        }

        let value = compute().await?;
        self.put(key, &value).await;

        Ok(value)
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        self.store.ping().await
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }
}

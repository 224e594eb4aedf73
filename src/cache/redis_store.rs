/// Redis cache backend
use super::{CacheConfig, CacheError, CacheStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::{future::Future, time::Duration};
use tracing::{error, info, warn};

/// Redis cache client
///
/// `ConnectionManager` is a cheap clone over one multiplexed connection
/// that reconnects on its own, so a single instance is shared by all requests.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    operation_timeout: Duration,
}

impl RedisCache {
    /// Connect to redis
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        info!("Connecting to Redis at {}", config.redis_url);

        let client = Client::open(config.redis_url.as_str()).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            CacheError::Unavailable(format!("Redis client creation failed: {}", e))
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to connect to Redis: {}", e);
            CacheError::Unavailable(format!("Redis connection failed: {}", e))
        })?;

        info!("Redis connection established");

        Ok(Self {
            connection,
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
        })
    }

    /// Bound a redis round trip so a stalled server cannot hang a request
    async fn bounded<T, F>(&self, op: &str, key: &str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!("Redis {} failed for {}: {}", op, key, e);
                Err(CacheError::Unavailable(format!("{} failed: {}", op, e)))
            }
            Err(_) => {
                warn!("Redis {} timed out for {}", op, key);
                Err(CacheError::Unavailable(format!("{} timed out", op)))
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection.clone();
        self.bounded("GET", key, conn.get::<_, Option<Vec<u8>>>(key))
            .await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        self.bounded("SET", key, conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()))
            .await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let pong: String = self
            .bounded("PING", "-", async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;

        if pong != "PONG" {
            return Err(CacheError::Unavailable(
                "Unexpected Redis PING response".to_string(),
            ));
        }

        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

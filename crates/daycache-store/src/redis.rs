//! Redis-based store implementation.
//!
//! Batched reads and existence checks are sent as one pipeline, so a range
//! lookup costs a single round trip regardless of its length. Batched writes
//! use an atomic (`MULTI`/`EXEC`) pipeline.

use async_trait::async_trait;
use daycache_core::{DataError, KeyValueStore, Result};
use redis::{AsyncCommands, Client, RedisError, aio::ConnectionManager};
use tracing::{debug, info, instrument};

/// Redis-backed key-value store.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to Redis at `url` (e.g. `redis://localhost:6379/0`).
    ///
    /// # Errors
    /// Returns [`DataError::InvalidParameter`] if the URL is malformed and
    /// [`DataError::StoreUnavailable`] if the server cannot be reached.
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to Redis...");

        let client = Client::open(url)
            .map_err(|e| DataError::InvalidParameter(format!("redis URL: {e}")))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DataError::StoreUnavailable(e.to_string()))?;

        info!("Redis connection established");
        Ok(Self { connection })
    }

    /// Pings the server.
    ///
    /// # Errors
    /// Returns [`DataError::StoreUnavailable`] if the server does not answer.
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(pong == "PONG")
    }
}

/// Maps connection-level failures to `StoreUnavailable` and everything else to `Store`.
fn map_redis_err(e: RedisError) -> DataError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
    {
        DataError::StoreUnavailable(e.to_string())
    } else {
        DataError::Store(e.to_string())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(map_redis_err)?;
        Ok(value)
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.set(key, value).await.map_err(map_redis_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let deleted: i64 = conn.del(key).await.map_err(map_redis_err)?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self))]
    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(key).await.map_err(map_redis_err)?;
        Ok(exists)
    }

    #[instrument(skip(self, keys), fields(count = keys.len()))]
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in keys {
            pipe.get(key);
        }

        let mut conn = self.connection.clone();
        let values: Vec<Option<Vec<u8>>> =
            pipe.query_async(&mut conn).await.map_err(map_redis_err)?;

        debug!(
            hits = values.iter().filter(|v| v.is_some()).count(),
            "Pipelined read"
        );
        Ok(values)
    }

    #[instrument(skip(self, keys), fields(count = keys.len()))]
    async fn exists_many(&self, keys: &[String]) -> Result<Vec<bool>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in keys {
            pipe.exists(key);
        }

        let mut conn = self.connection.clone();
        let found: Vec<bool> = pipe.query_async(&mut conn).await.map_err(map_redis_err)?;
        Ok(found)
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn set_many(&self, entries: &[(String, Vec<u8>)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            pipe.set(key, value.as_slice()).ignore();
        }

        let mut conn = self.connection.clone();
        let _: () = pipe.query_async(&mut conn).await.map_err(map_redis_err)?;

        debug!("Stored {} entries", entries.len());
        Ok(())
    }
}

//! Store selection from a connection URL.

use std::sync::Arc;

use daycache_core::{KeyValueStore, Result};
use daycache_store::InMemoryStore;
use tracing::info;

/// Opens the store named by `url`.
///
/// - `None` or `memory:` gives an [`InMemoryStore`]
/// - `redis://` / `rediss://` gives a `RedisStore` (feature `store-redis`)
/// - `sqlite:<path>` or any other value is treated as a SQLite file path
///   (feature `store-sqlite`)
///
/// # Errors
/// Returns [`DataError::StoreUnavailable`](daycache_core::DataError::StoreUnavailable)
/// if the backend cannot be opened, or
/// [`DataError::InvalidParameter`](daycache_core::DataError::InvalidParameter)
/// if its feature is not compiled in.
pub async fn open_store(url: Option<&str>) -> Result<Arc<dyn KeyValueStore>> {
    let url = url.map(str::trim).unwrap_or("memory:");

    if url.is_empty() || url == "memory:" {
        info!("Using in-memory store");
        return Ok(Arc::new(InMemoryStore::new()));
    }

    if url.starts_with("redis://") || url.starts_with("rediss://") {
        return open_redis(url).await;
    }

    open_sqlite(url.strip_prefix("sqlite:").unwrap_or(url))
}

#[cfg(feature = "store-redis")]
async fn open_redis(url: &str) -> Result<Arc<dyn KeyValueStore>> {
    Ok(Arc::new(daycache_store::RedisStore::connect(url).await?))
}

#[cfg(not(feature = "store-redis"))]
async fn open_redis(_url: &str) -> Result<Arc<dyn KeyValueStore>> {
    Err(daycache_core::DataError::InvalidParameter(
        "redis store requested but the `store-redis` feature is disabled".to_string(),
    ))
}

#[cfg(feature = "store-sqlite")]
fn open_sqlite(path: &str) -> Result<Arc<dyn KeyValueStore>> {
    info!(path, "Using SQLite store");
    Ok(Arc::new(daycache_store::SqliteStore::new(path)?))
}

#[cfg(not(feature = "store-sqlite"))]
fn open_sqlite(_path: &str) -> Result<Arc<dyn KeyValueStore>> {
    Err(daycache_core::DataError::InvalidParameter(
        "sqlite store requested but the `store-sqlite` feature is disabled".to_string(),
    ))
}

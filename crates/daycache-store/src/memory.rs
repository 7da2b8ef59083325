//! In-memory store implementation.

use async_trait::async_trait;
use daycache_core::{DataError, KeyValueStore, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

/// Simple in-memory store for testing and development.
///
/// Values are stored in a `RwLock`-protected `HashMap` and are lost when the
/// store is dropped. Every trait call counts as one round trip, so tests can
/// assert that batched reads stay batched. The store can be taken offline to
/// simulate an unreachable backend.
#[derive(Debug)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    round_trips: AtomicUsize,
    online: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            round_trips: AtomicUsize::new(0),
            online: AtomicBool::new(true),
        }
    }
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trait calls served so far (including failed ones).
    #[must_use]
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// Resets the round trip counter.
    pub fn reset_round_trips(&self) {
        self.round_trips.store(0, Ordering::SeqCst);
    }

    /// Marks the store reachable or unreachable.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Counts one round trip and fails if the store is offline.
    fn round_trip(&self) -> Result<()> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DataError::StoreUnavailable(
                "in-memory store is offline".to_string(),
            ))
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.round_trip()?;
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(value) => {
                trace!("Store hit");
                Ok(Some(value.clone()))
            }
            None => {
                trace!("Store miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.round_trip()?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<bool> {
        self.round_trip()?;
        Ok(self.entries.write().await.remove(key).is_some())
    }

    #[instrument(skip(self))]
    async fn exists(&self, key: &str) -> Result<bool> {
        self.round_trip()?;
        Ok(self.entries.read().await.contains_key(key))
    }

    #[instrument(skip(self, keys), fields(count = keys.len()))]
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        self.round_trip()?;
        let entries = self.entries.read().await;
        let values: Vec<Option<Vec<u8>>> = keys.iter().map(|k| entries.get(k).cloned()).collect();
        debug!(
            hits = values.iter().filter(|v| v.is_some()).count(),
            "Batched read"
        );
        Ok(values)
    }

    #[instrument(skip(self, keys), fields(count = keys.len()))]
    async fn exists_many(&self, keys: &[String]) -> Result<Vec<bool>> {
        self.round_trip()?;
        let entries = self.entries.read().await;
        Ok(keys.iter().map(|k| entries.contains_key(k)).collect())
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn set_many(&self, entries: &[(String, Vec<u8>)]) -> Result<()> {
        self.round_trip()?;
        let mut map = self.entries.write().await;
        for (key, value) in entries {
            map.insert(key.clone(), value.clone());
        }
        debug!("Wrote {} entries", entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_get_set() {
        let store = InMemoryStore::new();

        // Initially no data
        assert!(store.get("k").await.unwrap().is_none());
        assert!(!store.exists("k").await.unwrap());

        store.set("k", b"v1").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v1".to_vec()));

        // Overwrite
        store.set("k", b"v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v2".to_vec()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_store_batches_are_single_round_trips() {
        let store = InMemoryStore::new();
        store
            .set_many(&[
                ("a".to_string(), b"1".to_vec()),
                ("c".to_string(), b"3".to_vec()),
            ])
            .await
            .unwrap();
        store.reset_round_trips();

        let keys: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let values = store.get_many(&keys).await.unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
        assert_eq!(store.exists_many(&keys).await.unwrap(), vec![true, false, true]);
        assert_eq!(store.round_trips(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_offline_is_not_a_miss() {
        let store = InMemoryStore::new();
        store.set("k", b"v").await.unwrap();
        store.set_online(false);

        let err = store.get("k").await.unwrap_err();
        assert!(err.is_store_unavailable());
        assert!(store.get_many(&["k".to_string()]).await.is_err());

        store.set_online(true);
        assert!(store.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_memory_store_delete() {
        let store = InMemoryStore::new();
        store.set("k", b"v").await.unwrap();

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(store.is_empty().await);
    }
}

//! Key-value store trait backing the day cache.
//!
//! This module defines the [`KeyValueStore`] trait that provides a unified
//! interface over byte-valued backends (in-memory, SQLite, Redis, etc.).

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::Result;

/// Trait for byte-valued key-value backends.
///
/// Implementations must report an unreachable backend as
/// [`DataError::StoreUnavailable`](crate::DataError::StoreUnavailable), never as
/// a missing key, and must not retry internally.
///
/// The batched methods have default implementations that loop over the
/// single-key ones. Backends that can answer a batch in one round trip
/// should override them.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "sqlite").
    fn name(&self) -> &str;

    /// Reads one key.
    ///
    /// Returns `Ok(Some(bytes))` if present, `Ok(None)` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes one key, overwriting any existing value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Removes one key. Returns true if it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Checks whether a key exists.
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Reads many keys.
    ///
    /// The result has one entry per input key, in input order.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }

    /// Checks many keys for existence, in input order.
    async fn exists_many(&self, keys: &[String]) -> Result<Vec<bool>> {
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            found.push(self.exists(key).await?);
        }
        Ok(found)
    }

    /// Writes many keys.
    ///
    /// Backends that support transactions write all entries or none.
    async fn set_many(&self, entries: &[(String, Vec<u8>)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Store implementing only the required methods.
    #[derive(Debug, Default)]
    struct MapStore {
        map: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl KeyValueStore for MapStore {
        fn name(&self) -> &str {
            "map"
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.map.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
            self.map
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<bool> {
            Ok(self.map.lock().unwrap().remove(key).is_some())
        }
    }

    #[tokio::test]
    async fn test_default_batch_methods_follow_input_order() {
        let store = MapStore::default();
        store
            .set_many(&[
                ("b".to_string(), b"2".to_vec()),
                ("a".to_string(), b"1".to_vec()),
            ])
            .await
            .unwrap();

        let keys = vec!["a".to_string(), "missing".to_string(), "b".to_string()];
        let values = store.get_many(&keys).await.unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec()), None, Some(b"2".to_vec())]);

        let found = store.exists_many(&keys).await.unwrap();
        assert_eq!(found, vec![true, false, true]);

        assert!(store.delete("a").await.unwrap());
        assert!(!store.exists("a").await.unwrap());
    }
}

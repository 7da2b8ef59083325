//! SQLite-based store implementation.

use async_trait::async_trait;
use chrono::Utc;
use daycache_core::{DataError, KeyValueStore, Result};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params, params_from_iter};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

/// Maximum number of bound parameters per `IN (...)` query.
const MAX_KEYS_PER_QUERY: usize = 500;

/// SQLite-based key-value store.
///
/// Values live in a single `kv_cache` table, providing persistence across
/// application restarts. Batched reads are answered with one `IN (...)` query
/// per [`MAX_KEYS_PER_QUERY`] keys and batched writes run inside one
/// transaction.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new SQLite store at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns [`DataError::StoreUnavailable`] if the database cannot be opened,
    /// or a store error if schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn =
            Connection::open(path).map_err(|e| DataError::StoreUnavailable(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DataError::StoreUnavailable(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_cache (
                key TEXT PRIMARY KEY NOT NULL,
                value BLOB NOT NULL,
                cached_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(map_sqlite_err)?;

        debug!("SQLite store schema initialized");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DataError::StoreUnavailable(e.to_string()))
    }
}

/// Maps connection-level failures to `StoreUnavailable` and everything else to `Store`.
fn map_sqlite_err(e: rusqlite::Error) -> DataError {
    match e.sqlite_error_code() {
        Some(
            ErrorCode::CannotOpen
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::SystemIoFailure
            | ErrorCode::NotADatabase,
        ) => DataError::StoreUnavailable(e.to_string()),
        _ => DataError::Store(e.to_string()),
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM kv_cache WHERE key = ?1",
            params![key],
            |row| row.get::<_, Vec<u8>>(0),
        )
        .optional()
        .map_err(map_sqlite_err)
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let cached_at = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv_cache (key, value, cached_at) VALUES (?1, ?2, ?3)",
            params![key, value, cached_at],
        )
        .map_err(map_sqlite_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn
            .execute("DELETE FROM kv_cache WHERE key = ?1", params![key])
            .map_err(map_sqlite_err)?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self))]
    async fn exists(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM kv_cache WHERE key = ?1",
                params![key],
                |_| Ok(()),
            )
            .optional()
            .map_err(map_sqlite_err)?;
        Ok(found.is_some())
    }

    #[instrument(skip(self, keys), fields(count = keys.len()))]
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let conn = self.lock()?;
        let mut found: HashMap<String, Vec<u8>> = HashMap::with_capacity(keys.len());

        for chunk in keys.chunks(MAX_KEYS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("SELECT key, value FROM kv_cache WHERE key IN ({placeholders})");
            let mut stmt = conn.prepare(&sql).map_err(map_sqlite_err)?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                })
                .map_err(map_sqlite_err)?;

            for row in rows {
                let (key, value) = row.map_err(map_sqlite_err)?;
                found.insert(key, value);
            }
        }

        debug!("Found {} of {} keys", found.len(), keys.len());
        Ok(keys.iter().map(|k| found.remove(k)).collect())
    }

    #[instrument(skip(self, keys), fields(count = keys.len()))]
    async fn exists_many(&self, keys: &[String]) -> Result<Vec<bool>> {
        let conn = self.lock()?;
        let mut found: HashSet<String> = HashSet::with_capacity(keys.len());

        for chunk in keys.chunks(MAX_KEYS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("SELECT key FROM kv_cache WHERE key IN ({placeholders})");
            let mut stmt = conn.prepare(&sql).map_err(map_sqlite_err)?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), |row| row.get::<_, String>(0))
                .map_err(map_sqlite_err)?;

            for row in rows {
                found.insert(row.map_err(map_sqlite_err)?);
            }
        }

        Ok(keys.iter().map(|k| found.contains(k)).collect())
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn set_many(&self, entries: &[(String, Vec<u8>)]) -> Result<()> {
        let cached_at = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(map_sqlite_err)?;

        for (key, value) in entries {
            tx.execute(
                "INSERT OR REPLACE INTO kv_cache (key, value, cached_at) VALUES (?1, ?2, ?3)",
                params![key, value, cached_at],
            )
            .map_err(map_sqlite_err)?;
        }

        tx.commit().map_err(map_sqlite_err)?;
        debug!("Stored {} entries", entries.len());
        Ok(())
    }
}

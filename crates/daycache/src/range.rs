//! Day-granular cache over a key-value store.

use std::fmt;
use std::sync::Arc;

use daycache_core::{
    CacheSettings, DataError, Day, DayRange, Entity, KeyValueStore, Record, Result,
};
use tracing::{debug, instrument};

/// Maps (entity, day) to a [`Record`] in a [`KeyValueStore`].
///
/// Keys have the shape `{namespace}:{entity}:{YYYY-MM-DD}`. Range reads and
/// missing-day detection are each answered with one batched store call, so
/// their round trips do not grow with the length of the range.
///
/// A day with no key has never been fetched. A day holding an empty record
/// was fetched and had nothing.
#[derive(Clone)]
pub struct RangeCacheStore {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl fmt::Debug for RangeCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeCacheStore")
            .field("store", &self.store.name())
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl RangeCacheStore {
    /// Create a cache with the default namespace.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_settings(store, &CacheSettings::default())
    }

    /// Create a cache using the given key settings.
    #[must_use]
    pub fn with_settings(store: Arc<dyn KeyValueStore>, settings: &CacheSettings) -> Self {
        Self {
            store,
            namespace: settings.namespace.clone(),
        }
    }

    /// Key prefix in use.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Storage key for one (entity, day).
    #[must_use]
    pub fn key(&self, entity: &Entity, day: Day) -> String {
        format!("{}:{}:{}", self.namespace, entity, day.format("%Y-%m-%d"))
    }

    fn keys(&self, entity: &Entity, range: DayRange) -> Vec<String> {
        range.days().map(|day| self.key(entity, day)).collect()
    }

    /// Returns true if a record exists for the day.
    #[instrument(skip(self), fields(entity = %entity))]
    pub async fn has(&self, entity: &Entity, day: Day) -> Result<bool> {
        self.store.exists(&self.key(entity, day)).await
    }

    /// Reads the record for one day.
    #[instrument(skip(self), fields(entity = %entity))]
    pub async fn get(&self, entity: &Entity, day: Day) -> Result<Option<Record>> {
        match self.store.get(&self.key(entity, day)).await? {
            Some(bytes) => Ok(Some(Record::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Reads every present day in the range, ascending.
    ///
    /// Days without a record are skipped.
    #[instrument(skip(self), fields(entity = %entity, range = %range))]
    pub async fn get_range(&self, entity: &Entity, range: DayRange) -> Result<Vec<(Day, Record)>> {
        let values = self.store.get_many(&self.keys(entity, range)).await?;

        let mut records = Vec::with_capacity(values.len());
        for (day, value) in range.days().zip(values) {
            if let Some(bytes) = value {
                records.push((day, Record::from_bytes(&bytes)?));
            }
        }

        debug!("Read {} of {} days", records.len(), range.len());
        Ok(records)
    }

    /// Writes the record for one day, replacing any existing one.
    #[instrument(skip(self, record), fields(entity = %entity, items = record.len()))]
    pub async fn put(&self, entity: &Entity, day: Day, record: &Record) -> Result<()> {
        self.store
            .set(&self.key(entity, day), &record.to_bytes()?)
            .await
    }

    /// Writes several days in one batch.
    ///
    /// Either every day is written or, on backends with transactions, none is.
    #[instrument(skip(self, records), fields(entity = %entity, days = records.len()))]
    pub async fn put_many(&self, entity: &Entity, records: &[(Day, Record)]) -> Result<()> {
        let entries = records
            .iter()
            .map(|(day, record)| Ok((self.key(entity, *day), record.to_bytes()?)))
            .collect::<Result<Vec<_>>>()?;
        self.store.set_many(&entries).await
    }

    /// Every day in the range without a record, ascending.
    #[instrument(skip(self), fields(entity = %entity, range = %range))]
    pub async fn missing_days(&self, entity: &Entity, range: DayRange) -> Result<Vec<Day>> {
        let found = self.store.exists_many(&self.keys(entity, range)).await?;
        if found.len() != range.len() {
            return Err(DataError::Store(format!(
                "expected {} existence flags, got {}",
                range.len(),
                found.len()
            )));
        }

        let missing: Vec<Day> = range
            .days()
            .zip(found)
            .filter_map(|(day, present)| (!present).then_some(day))
            .collect();

        debug!("{} of {} days missing", missing.len(), range.len());
        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::day;
    use daycache_store::{InMemoryStore, SqliteStore};
    use serde_json::json;

    fn entity() -> Entity {
        Entity::new("ACME").unwrap()
    }

    fn range(from: Day, to: Day) -> DayRange {
        DayRange::new(from, to).unwrap()
    }

    #[test]
    fn test_key_shape() {
        let cache = RangeCacheStore::with_settings(
            Arc::new(InMemoryStore::new()),
            &CacheSettings {
                namespace: "news".to_string(),
            },
        );
        assert_eq!(cache.key(&entity(), day(2024, 1, 5)), "news:ACME:2024-01-05");
    }

    #[tokio::test]
    async fn test_absent_and_empty_are_distinct() {
        let cache = RangeCacheStore::new(Arc::new(InMemoryStore::new()));
        let d = day(2024, 1, 1);

        assert!(!cache.has(&entity(), d).await.unwrap());
        assert!(cache.get(&entity(), d).await.unwrap().is_none());

        cache.put(&entity(), d, &Record::empty()).await.unwrap();

        assert!(cache.has(&entity(), d).await.unwrap());
        let record = cache.get(&entity(), d).await.unwrap().unwrap();
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn test_entities_are_case_sensitive() {
        let cache = RangeCacheStore::new(Arc::new(InMemoryStore::new()));
        let d = day(2024, 1, 1);
        cache
            .put(&entity(), d, &Record::new(vec![json!(1)]))
            .await
            .unwrap();

        let lower = Entity::new("acme").unwrap();
        assert!(!cache.has(&lower, d).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_range_skips_absent_days_in_order() {
        let cache = RangeCacheStore::new(Arc::new(InMemoryStore::new()));
        cache
            .put(&entity(), day(2024, 1, 3), &Record::new(vec![json!("c")]))
            .await
            .unwrap();
        cache
            .put(&entity(), day(2024, 1, 1), &Record::new(vec![json!("a")]))
            .await
            .unwrap();

        let records = cache
            .get_range(&entity(), range(day(2024, 1, 1), day(2024, 1, 4)))
            .await
            .unwrap();

        let days: Vec<Day> = records.iter().map(|(d, _)| *d).collect();
        assert_eq!(days, vec![day(2024, 1, 1), day(2024, 1, 3)]);
        assert_eq!(records[1].1.items(), &[json!("c")]);
    }

    #[tokio::test]
    async fn test_range_reads_are_one_round_trip() {
        let store = Arc::new(InMemoryStore::new());
        let cache = RangeCacheStore::new(store.clone());
        let long = range(day(2024, 1, 1), day(2024, 12, 31));

        store.reset_round_trips();
        cache.get_range(&entity(), long).await.unwrap();
        assert_eq!(store.round_trips(), 1);

        store.reset_round_trips();
        let missing = cache.missing_days(&entity(), long).await.unwrap();
        assert_eq!(store.round_trips(), 1);
        assert_eq!(missing.len(), 366);
    }

    #[tokio::test]
    async fn test_missing_days_and_range_partition_the_range() {
        let cache = RangeCacheStore::new(Arc::new(SqliteStore::in_memory().unwrap()));
        let full = range(day(2024, 2, 27), day(2024, 3, 2));
        cache
            .put_many(
                &entity(),
                &[
                    (day(2024, 2, 28), Record::new(vec![json!("x")])),
                    (day(2024, 3, 1), Record::empty()),
                ],
            )
            .await
            .unwrap();

        let missing = cache.missing_days(&entity(), full).await.unwrap();
        let present: Vec<Day> = cache
            .get_range(&entity(), full)
            .await
            .unwrap()
            .into_iter()
            .map(|(d, _)| d)
            .collect();

        assert_eq!(
            missing,
            vec![day(2024, 2, 27), day(2024, 2, 29), day(2024, 3, 2)]
        );
        assert_eq!(present, vec![day(2024, 2, 28), day(2024, 3, 1)]);

        let mut all: Vec<Day> = missing.into_iter().chain(present).collect();
        all.sort();
        assert_eq!(all, full.days().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_missing_days_split_matches_whole() {
        let cache = RangeCacheStore::new(Arc::new(InMemoryStore::new()));
        let (d1, d2, d3) = (day(2024, 1, 1), day(2024, 1, 10), day(2024, 1, 20));

        let whole = cache.missing_days(&entity(), range(d1, d3)).await.unwrap();
        let mut split = cache.missing_days(&entity(), range(d1, d2)).await.unwrap();
        split.extend(
            cache
                .missing_days(&entity(), range(d2.succ_opt().unwrap(), d3))
                .await
                .unwrap(),
        );

        assert_eq!(whole, split);
        assert_eq!(whole.len(), 20);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let cache = RangeCacheStore::new(Arc::new(InMemoryStore::new()));
        let d = day(2024, 1, 1);
        cache
            .put(&entity(), d, &Record::new(vec![json!("old")]))
            .await
            .unwrap();
        cache
            .put(&entity(), d, &Record::new(vec![json!("new")]))
            .await
            .unwrap();

        let record = cache.get(&entity(), d).await.unwrap().unwrap();
        assert_eq!(record.items(), &[json!("new")]);
    }

    #[tokio::test]
    async fn test_unavailable_store_is_not_a_miss() {
        let store = Arc::new(InMemoryStore::new());
        let cache = RangeCacheStore::new(store.clone());
        store.set_online(false);

        let err = cache
            .missing_days(&entity(), range(day(2024, 1, 1), day(2024, 1, 2)))
            .await
            .unwrap_err();
        assert!(err.is_store_unavailable());
        assert!(cache.has(&entity(), day(2024, 1, 1)).await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_codec_error() {
        let store = Arc::new(InMemoryStore::new());
        let cache = RangeCacheStore::new(store.clone());
        let d = day(2024, 1, 1);
        store
            .set(&cache.key(&entity(), d), b"not a record")
            .await
            .unwrap();

        assert!(matches!(
            cache.get(&entity(), d).await,
            Err(DataError::Codec(_))
        ));
    }
}

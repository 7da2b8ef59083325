//! Fetch-if-missing orchestration over the day cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use daycache_core::{
    Day, DayRange, Entity, FetchRequest, Item, KeyValueStore, Record, RemoteSource, Result,
    Settings,
};
use serde_json::Value;
use tracing::{debug, info, instrument, trace};

use crate::{fetcher::BackoffFetcher, range::RangeCacheStore};

/// Serves day ranges from the cache, fetching only when days are missing.
///
/// A range with missing days costs exactly one upstream fetch for the whole
/// requested range. The result is split by item day and every missing day is
/// written, including an empty record for days that yielded nothing, so the
/// same range is never fetched twice. If the fetch fails nothing is written.
///
/// Two concurrent calls over overlapping ranges may both fetch. Writes are
/// per-day overwrites, so the cache stays consistent.
#[derive(Debug, Clone)]
pub struct Aggregator {
    fetcher: BackoffFetcher,
    cache: RangeCacheStore,
}

impl Aggregator {
    /// Create an aggregator from its parts.
    #[must_use]
    pub const fn new(fetcher: BackoffFetcher, cache: RangeCacheStore) -> Self {
        Self { fetcher, cache }
    }

    /// Create an aggregator configured from [`Settings`].
    #[must_use]
    pub fn from_settings(
        source: Arc<dyn RemoteSource>,
        store: Arc<dyn KeyValueStore>,
        settings: &Settings,
    ) -> Self {
        Self::new(
            BackoffFetcher::new(source, settings.fetch),
            RangeCacheStore::with_settings(store, &settings.cache),
        )
    }

    /// The underlying fetcher.
    #[must_use]
    pub const fn fetcher(&self) -> &BackoffFetcher {
        &self.fetcher
    }

    /// The underlying cache.
    #[must_use]
    pub const fn cache(&self) -> &RangeCacheStore {
        &self.cache
    }

    /// Returns a record for every day in `start..=end`, fetching missing days.
    ///
    /// # Errors
    /// - [`DataError::InvalidRange`](daycache_core::DataError::InvalidRange) if `start > end`, before any I/O
    /// - [`DataError::StoreUnavailable`](daycache_core::DataError::StoreUnavailable) if the cache cannot be reached
    /// - [`DataError::FetchFailed`](daycache_core::DataError::FetchFailed) if the upstream exhausted its retries
    #[instrument(skip(self), fields(entity = %entity))]
    pub async fn ensure_range(
        &self,
        entity: &Entity,
        start: Day,
        end: Day,
    ) -> Result<Vec<(Day, Record)>> {
        let range = DayRange::new(start, end)?;

        let missing = self.cache.missing_days(entity, range).await?;
        if missing.is_empty() {
            debug!("Cache hit for {} days", range.len());
            return self.cache.get_range(entity, range).await;
        }

        debug!(
            missing = missing.len(),
            total = range.len(),
            "Cache miss, fetching range"
        );
        self.fetch_and_store(entity, range, &missing).await?;
        self.cache.get_range(entity, range).await
    }

    /// Like [`ensure_range`](Self::ensure_range) but parses its inputs.
    ///
    /// Days use `YYYY-MM-DD`.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidParameter`](daycache_core::DataError::InvalidParameter)
    /// for a blank entity and [`DataError::InvalidDay`](daycache_core::DataError::InvalidDay)
    /// for a malformed day, before any I/O; otherwise as `ensure_range`.
    pub async fn ensure_range_str(
        &self,
        entity: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<(Day, Record)>> {
        let entity = Entity::new(entity)?;
        let range = DayRange::parse(start, end)?;
        self.ensure_range(&entity, range.start(), range.end()).await
    }

    /// Fetches the whole range and overwrites every day in it.
    ///
    /// # Errors
    /// As [`ensure_range`](Self::ensure_range). On fetch failure the cache is untouched.
    #[instrument(skip(self), fields(entity = %entity))]
    pub async fn refresh_range(
        &self,
        entity: &Entity,
        start: Day,
        end: Day,
    ) -> Result<Vec<(Day, Record)>> {
        let range = DayRange::new(start, end)?;
        let days: Vec<Day> = range.days().collect();

        self.fetch_and_store(entity, range, &days).await?;
        self.cache.get_range(entity, range).await
    }

    /// One fetch for `range`, then one batched write of `days`.
    async fn fetch_and_store(&self, entity: &Entity, range: DayRange, days: &[Day]) -> Result<()> {
        let request = FetchRequest::new(entity.clone(), range);
        let items = self.fetcher.fetch(&request).await?;

        let records = partition_by_day(items, days);
        let filled = records.iter().filter(|(_, r)| !r.is_empty()).count();
        self.cache.put_many(entity, &records).await?;

        info!(
            source = self.fetcher.source_name(),
            days = records.len(),
            with_items = filled,
            "Cached fetched range"
        );
        Ok(())
    }
}

/// Groups items into one record per day in `days`, preserving upstream order.
///
/// Days with no items get an empty record; items for other days are dropped.
fn partition_by_day(items: Vec<Item>, days: &[Day]) -> Vec<(Day, Record)> {
    let mut groups: BTreeMap<Day, Vec<Value>> = days.iter().map(|d| (*d, Vec::new())).collect();

    let mut dropped = 0usize;
    for item in items {
        match groups.get_mut(&item.day) {
            Some(group) => group.push(item.payload),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        trace!(dropped, "Ignored items outside the days being written");
    }

    groups
        .into_iter()
        .map(|(day, payloads)| (day, Record::new(payloads)))
        .collect()
}

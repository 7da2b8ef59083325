//! Scripted remote source for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use daycache_core::{DataError, Day, FetchRequest, Item, RemoteSource, Result};
use serde_json::json;
use tokio::time::Instant;

/// Remote source that fails a fixed number of times, then serves its items.
///
/// Only items inside the requested range are returned, like a real upstream.
#[derive(Debug, Default)]
pub(crate) struct MockSource {
    items: Vec<Item>,
    fail_first: u32,
    calls: AtomicU32,
    call_times: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockSource {
    pub(crate) fn returning(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub(crate) fn failing_times(fail_first: u32, items: Vec<Item>) -> Self {
        Self {
            items,
            fail_first,
            ..Default::default()
        }
    }

    pub(crate) fn always_failing() -> Self {
        Self::failing_times(u32::MAX, Vec::new())
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    pub(crate) fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Item>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.call_times.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(request.clone());

        if n <= self.fail_first {
            return Err(DataError::Network(format!("attempt {n} refused")));
        }

        Ok(self
            .items
            .iter()
            .filter(|item| request.range.contains(item.day))
            .cloned()
            .collect())
    }
}

pub(crate) fn day(y: i32, m: u32, d: u32) -> Day {
    Day::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn headline(day: Day, title: &str) -> Item {
    Item::new(day, json!({ "title": title, "day": day.to_string() }))
}

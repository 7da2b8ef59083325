//! Minimum-interval throttle shared by outbound callers.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Enforces a minimum interval between consecutive outbound calls.
///
/// Share one `Throttle` (behind an `Arc`) between every caller that hits the
/// same upstream rate limit. Reading the last call time, sleeping for the
/// remainder and recording the new call time happen under one lock, so
/// concurrent callers are released one interval apart.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    /// Creates a throttle with the given minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// The configured minimum interval.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until a call is allowed, then records it.
    ///
    /// Returns how long the caller was held back.
    pub async fn acquire(&self) -> Duration {
        let mut last_call = self.last_call.lock().await;

        let mut waited = Duration::ZERO;
        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {:?}", waited);
                sleep(waited).await;
            }
        }

        *last_call = Some(Instant::now());
        waited
    }
}

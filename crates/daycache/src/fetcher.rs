//! Throttled, retrying wrapper around a remote source.

use std::fmt;
use std::sync::Arc;

use daycache_core::{DataError, FetchPolicy, FetchRequest, Item, RemoteSource, Result};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::throttle::Throttle;

/// Calls a [`RemoteSource`] with rate limiting and exponential-backoff retry.
///
/// Every attempt, retries included, first passes through the shared
/// [`Throttle`]. After a failed attempt the fetcher sleeps for the current
/// delay, starting at the policy's base delay and doubling each time. Once the
/// attempt budget is spent the last error is returned inside
/// [`DataError::FetchFailed`].
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use daycache::{BackoffFetcher, FetchPolicy, Throttle};
///
/// let throttle = Arc::new(Throttle::new(policy.min_interval()));
/// let news = BackoffFetcher::with_throttle(news_source, policy, Arc::clone(&throttle));
/// let prices = BackoffFetcher::with_throttle(price_source, policy, throttle);
/// ```
#[derive(Clone)]
pub struct BackoffFetcher {
    source: Arc<dyn RemoteSource>,
    throttle: Arc<Throttle>,
    policy: FetchPolicy,
}

impl fmt::Debug for BackoffFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffFetcher")
            .field("source", &self.source.name())
            .field("throttle", &self.throttle)
            .field("policy", &self.policy)
            .finish()
    }
}

impl BackoffFetcher {
    /// Create a fetcher with its own throttle sized from `policy`.
    #[must_use]
    pub fn new(source: Arc<dyn RemoteSource>, policy: FetchPolicy) -> Self {
        let throttle = Arc::new(Throttle::new(policy.min_interval()));
        Self::with_throttle(source, policy, throttle)
    }

    /// Create a fetcher that shares an existing throttle.
    ///
    /// The throttle's own interval is used; `policy.min_interval_ms` is ignored.
    #[must_use]
    pub fn with_throttle(
        source: Arc<dyn RemoteSource>,
        policy: FetchPolicy,
        throttle: Arc<Throttle>,
    ) -> Self {
        Self {
            source,
            throttle,
            policy,
        }
    }

    /// The throttle guarding this fetcher's calls.
    #[must_use]
    pub const fn throttle(&self) -> &Arc<Throttle> {
        &self.throttle
    }

    /// The retry policy.
    #[must_use]
    pub const fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Name of the wrapped source.
    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Fetch `request`, retrying failed attempts.
    ///
    /// # Errors
    /// Returns [`DataError::FetchFailed`] carrying the last cause once every
    /// attempt has failed.
    #[instrument(skip(self), fields(source = self.source.name(), entity = %request.entity, range = %request.range))]
    pub async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Item>> {
        let max_attempts = self.policy.attempts();
        let mut delay = self.policy.base_delay();
        let mut attempt = 1;

        loop {
            self.throttle.acquire().await;

            match self.source.fetch(request).await {
                Ok(items) => {
                    debug!(attempt, count = items.len(), "Fetch succeeded");
                    return Ok(items);
                }
                Err(e) if attempt >= max_attempts => {
                    warn!(attempt, error = %e, "Fetch failed, giving up");
                    return Err(DataError::FetchFailed {
                        attempts: attempt,
                        cause: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!(
                        "Fetch attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }
}

//! Configuration for fetching and caching.
//!
//! This module defines [`FetchPolicy`] for throttling and retrying upstream
//! calls, [`CacheSettings`] for key layout, and [`Settings`] which bundles them
//! with connection details and can be loaded from the environment.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DataError, Result};

/// Default minimum interval between outbound calls in milliseconds.
const DEFAULT_MIN_INTERVAL_MS: u64 = 1000;

/// Default number of attempts per logical fetch.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry in milliseconds.
const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Default key namespace.
const DEFAULT_NAMESPACE: &str = "daycache";

/// Throttle and retry policy for upstream calls.
///
/// Durations are kept at millisecond granularity. Setters round a
/// sub-millisecond remainder up, so a non-zero duration never becomes zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    /// Minimum interval between consecutive outbound calls, in milliseconds.
    pub min_interval_ms: u64,
    /// Maximum number of attempts per fetch, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds. Doubles after each failure.
    pub base_delay_ms: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl FetchPolicy {
    /// Creates a policy from durations.
    #[must_use]
    pub fn new(min_interval: Duration, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            min_interval_ms: millis_ceil(min_interval),
            max_attempts,
            base_delay_ms: millis_ceil(base_delay),
        }
    }

    /// Sets the minimum interval between outbound calls.
    #[must_use]
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval_ms = millis_ceil(min_interval);
        self
    }

    /// Sets the maximum number of attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay_ms = millis_ceil(base_delay);
        self
    }

    /// Minimum interval between outbound calls.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Effective attempt budget; never less than one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before the first retry.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Whole milliseconds in `duration`, rounded up and saturating at `u64::MAX`.
fn millis_ceil(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

/// Key layout settings for the day cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Prefix for every cache key.
    pub namespace: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Full runtime settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Throttle and retry policy.
    pub fetch: FetchPolicy,
    /// Key layout.
    pub cache: CacheSettings,
    /// Store connection URL (e.g. `redis://localhost:6379/0` or a SQLite path).
    pub store_url: Option<String>,
    /// API key for the news source.
    pub news_api_key: Option<String>,
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// A `.env` file in the working directory is read first if present.
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidParameter`] if a numeric variable is malformed.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    ///
    /// Reads `DAYCACHE_MIN_INTERVAL_MS`, `DAYCACHE_MAX_ATTEMPTS`,
    /// `DAYCACHE_BASE_DELAY_MS`, `DAYCACHE_NAMESPACE`, `DAYCACHE_STORE_URL`
    /// and `NEWS_API_KEY`.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidParameter`] if a numeric variable is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(v) = lookup("DAYCACHE_MIN_INTERVAL_MS") {
            settings.fetch.min_interval_ms = parse_number("DAYCACHE_MIN_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("DAYCACHE_MAX_ATTEMPTS") {
            settings.fetch.max_attempts = parse_number("DAYCACHE_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("DAYCACHE_BASE_DELAY_MS") {
            settings.fetch.base_delay_ms = parse_number("DAYCACHE_BASE_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("DAYCACHE_NAMESPACE").filter(|v| !v.trim().is_empty()) {
            settings.cache.namespace = v;
        }
        settings.store_url = lookup("DAYCACHE_STORE_URL").filter(|v| !v.trim().is_empty());
        settings.news_api_key = lookup("NEWS_API_KEY").filter(|v| !v.trim().is_empty());

        Ok(settings)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| DataError::InvalidParameter(format!("{name}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_fetch_policy_defaults() {
        let policy = FetchPolicy::default();
        assert_eq!(policy.min_interval(), Duration::from_secs(1));
        assert_eq!(policy.attempts(), 3);
        assert_eq!(policy.base_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let policy = FetchPolicy::default().with_max_attempts(0);
        assert_eq!(policy.attempts(), 1);
    }

    #[test]
    fn test_sub_millisecond_durations_round_up() {
        let policy = FetchPolicy::new(Duration::from_micros(1), 3, Duration::from_micros(1500));
        assert_eq!(policy.min_interval(), Duration::from_millis(1));
        assert_eq!(policy.base_delay(), Duration::from_millis(2));

        let policy = policy
            .with_min_interval(Duration::ZERO)
            .with_base_delay(Duration::from_millis(250));
        assert_eq!(policy.min_interval_ms, 0);
        assert_eq!(policy.base_delay_ms, 250);

        let huge = FetchPolicy::default().with_base_delay(Duration::MAX);
        assert_eq!(huge.base_delay_ms, u64::MAX);
    }

    #[test]
    fn test_settings_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("DAYCACHE_MIN_INTERVAL_MS", "250"),
            ("DAYCACHE_MAX_ATTEMPTS", "5"),
            ("DAYCACHE_NAMESPACE", "news"),
            ("DAYCACHE_STORE_URL", "redis://localhost:6379/0"),
            ("NEWS_API_KEY", ""),
        ]
        .into_iter()
        .collect();

        let settings =
            Settings::from_lookup(|key| vars.get(key).map(|v| (*v).to_string())).unwrap();

        assert_eq!(settings.fetch.min_interval(), Duration::from_millis(250));
        assert_eq!(settings.fetch.attempts(), 5);
        assert_eq!(settings.fetch.base_delay_ms, DEFAULT_BASE_DELAY_MS);
        assert_eq!(settings.cache.namespace, "news");
        assert_eq!(
            settings.store_url.as_deref(),
            Some("redis://localhost:6379/0")
        );
        assert!(settings.news_api_key.is_none());
    }

    #[test]
    fn test_settings_rejects_malformed_number() {
        let err = Settings::from_lookup(|key| {
            (key == "DAYCACHE_MAX_ATTEMPTS").then(|| "three".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, DataError::InvalidParameter(_)));
    }

    #[test]
    fn test_fetch_policy_deserializes_partial() {
        let policy: FetchPolicy = serde_json::from_str(r#"{"max_attempts": 7}"#).unwrap();
        assert_eq!(policy.max_attempts, 7);
        assert_eq!(policy.min_interval_ms, DEFAULT_MIN_INTERVAL_MS);
    }
}

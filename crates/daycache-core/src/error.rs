//! Error types for cache and fetch operations.
//!
//! This module defines [`DataError`] which covers every failure that can occur
//! while validating a request, talking to a remote source, or reading and
//! writing the key-value store.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur during cache and fetch operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// The requested range starts after it ends.
    #[error("Invalid range: {start} is after {end}")]
    InvalidRange {
        /// First day of the rejected range.
        start: NaiveDate,
        /// Last day of the rejected range.
        end: NaiveDate,
    },

    /// A day value could not be parsed.
    #[error("Invalid day: {0}")]
    InvalidDay(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The upstream kept failing until the retry budget was exhausted.
    #[error("Fetch failed after {attempts} attempt(s): {cause}")]
    FetchFailed {
        /// Number of attempts that were made.
        attempts: u32,
        /// The error returned by the last attempt.
        #[source]
        cause: Box<DataError>,
    },

    /// The cache backend could not be reached.
    ///
    /// This is never a cache miss.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The cache backend was reachable but rejected the operation.
    #[error("Store error: {0}")]
    Store(String),

    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// The upstream answered with a non-success response.
    #[error("Upstream error ({status}): {message}")]
    Upstream {
        /// HTTP status, or 0 when the error came in a success body.
        status: u16,
        /// Message reported by the upstream.
        message: String,
    },

    /// Error parsing data returned by an upstream.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A cached record could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(String),
}

impl DataError {
    /// Returns true if the cache backend was unreachable.
    #[must_use]
    pub const fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Returns true if the upstream exhausted its retries.
    #[must_use]
    pub const fn is_fetch_failed(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }
}

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_fetch_failed_keeps_cause() {
        let err = DataError::FetchFailed {
            attempts: 3,
            cause: Box::new(DataError::Network("connection reset".to_string())),
        };

        assert!(err.is_fetch_failed());
        assert!(!err.is_store_unavailable());
        assert_eq!(
            err.to_string(),
            "Fetch failed after 3 attempt(s): Network error: connection reset"
        );
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Network error: connection reset");
    }
}

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/daycache/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Key-value store backends for the day cache.
//!
//! This crate provides implementations of the [`KeyValueStore`] trait from `daycache-core`:
//!
//! - [`SqliteStore`] - Persistent SQLite-based store (default, requires `sqlite` feature)
//! - [`RedisStore`] - Redis store with pipelined batches (requires `redis` feature)
//! - [`InMemoryStore`] - In-memory store for testing

/// In-memory store implementation.
pub mod memory;

/// SQLite-based store implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Redis-based store implementation.
#[cfg(feature = "redis")]
pub mod redis;

// Re-export the trait for convenience
pub use daycache_core::KeyValueStore;

// Re-export implementations
pub use memory::InMemoryStore;

#[cfg(feature = "redis")]
pub use crate::redis::RedisStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

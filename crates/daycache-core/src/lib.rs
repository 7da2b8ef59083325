#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/daycache/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for day-keyed remote data caching.
//!
//! This crate provides the foundational abstractions shared by the store
//! backends, the remote sources and the aggregator:
//!
//! - [`KeyValueStore`](store::KeyValueStore) - Byte-valued key-value backend with batched access
//! - [`RemoteSource`](source::RemoteSource) - Upstream that returns day-stamped items for a range
//! - [`DayRange`](types::DayRange), [`Entity`](types::Entity), [`Record`](types::Record) - Data model
//! - [`FetchPolicy`](config::FetchPolicy), [`Settings`](config::Settings) - Configuration

/// Configuration structs and environment loading.
pub mod config;
/// Error types for cache and fetch operations.
pub mod error;
/// Remote source trait.
pub mod source;
/// Key-value store trait.
pub mod store;
/// Core data types (Entity, DayRange, Record, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use config::{CacheSettings, FetchPolicy, Settings};
pub use error::{DataError, Result};
pub use source::RemoteSource;
pub use store::KeyValueStore;
pub use types::{Day, DayRange, Entity, FetchRequest, Item, Record, parse_day};

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/daycache/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Day-keyed cache for remote data with throttled, retrying fetches.
//!
//! This crate ties the pieces together:
//!
//! - [`Throttle`] - Minimum-interval gate shared by outbound callers
//! - [`BackoffFetcher`] - Throttled, exponentially backed-off calls to a [`RemoteSource`]
//! - [`RangeCacheStore`] - (entity, day) records over any [`KeyValueStore`]
//! - [`Aggregator`] - `ensure_range`: serve from cache, fetch what is missing
//!
//! # Features
//!
//! - `newsapi` - News search source
//! - `yahoo` - Daily price source
//! - `store-sqlite` - SQLite store
//! - `store-redis` - Redis store
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use daycache::{Aggregator, NewsApiSource, Settings, open_store, parse_day};
//!
//! #[tokio::main]
//! async fn main() -> daycache::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let source = Arc::new(NewsApiSource::new(settings.news_api_key.clone().unwrap_or_default())?);
//!     let store = open_store(settings.store_url.as_deref()).await?;
//!     let aggregator = Aggregator::from_settings(source, store, &settings);
//!
//!     let records = aggregator
//!         .ensure_range_str("ACME", "2024-01-01", "2024-01-31")
//!         .await?;
//!     for (day, record) in records {
//!         println!("{day}: {} articles", record.len());
//!     }
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use daycache_core::*;

// Store implementations
pub use daycache_store::InMemoryStore;
#[cfg(feature = "store-redis")]
pub use daycache_store::RedisStore;
#[cfg(feature = "store-sqlite")]
pub use daycache_store::SqliteStore;

// Sources
#[cfg(feature = "newsapi")]
pub use daycache_newsapi::{Article, NewsApiSource};
#[cfg(feature = "yahoo")]
pub use daycache_yahoo::{DailyBar, YahooPriceSource};

mod aggregator;
mod connect;
mod fetcher;
#[cfg(test)]
mod mock;
mod range;
mod throttle;

pub use aggregator::Aggregator;
pub use connect::open_store;
pub use fetcher::BackoffFetcher;
pub use range::RangeCacheStore;
pub use throttle::Throttle;

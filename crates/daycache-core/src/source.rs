//! Remote source trait.
//!
//! A [`RemoteSource`] answers one [`FetchRequest`] with the day-stamped items it
//! found. Sources do not throttle or retry; the fetcher wrapping them does.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{FetchRequest, Item},
};

/// Upstream that returns day-stamped items for an entity over a day range.
///
/// Implementations should return [`DataError::Network`](crate::DataError::Network)
/// for transport failures, [`DataError::Upstream`](crate::DataError::Upstream)
/// for non-success responses and [`DataError::Parse`](crate::DataError::Parse)
/// for malformed payloads.
#[async_trait]
pub trait RemoteSource: Send + Sync + Debug {
    /// Returns the name of this source (e.g., "newsapi").
    fn name(&self) -> &str;

    /// Fetches every item for `request.entity` within `request.range`.
    ///
    /// Items may arrive in any order and may include days outside the
    /// requested range.
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Item>>;
}

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/daycache/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance daily price source.
//!
//! This crate provides [`YahooPriceSource`], a [`RemoteSource`] that requests
//! daily bars from Yahoo Finance's chart API. Each bar with a close price
//! becomes an [`Item`] whose payload is a [`DailyBar`].
//!
//! Bars are stamped with their trading day in the exchange's local time, so a
//! session that opens at 09:30 in New York lands on that calendar day
//! regardless of its UTC timestamp. Days without a bar (weekends, holidays)
//! simply yield no items.
//!
//! # Example
//!
//! ```no_run
//! use daycache_core::{DayRange, Entity, FetchRequest, RemoteSource};
//! use daycache_yahoo::{DailyBar, YahooPriceSource};
//!
//! # async fn example() -> daycache_core::Result<()> {
//! let source = YahooPriceSource::new()?;
//! let request = FetchRequest::new(
//!     Entity::new("AAPL")?,
//!     DayRange::parse("2024-01-01", "2024-01-31")?,
//! );
//!
//! for item in source.fetch(&request).await? {
//!     let bar = DailyBar::from_payload(&item.payload)?;
//!     println!("{}: {}", item.day, bar.close);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use daycache_core::{DataError, FetchRequest, Item, RemoteSource, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Yahoo Finance chart API base URL.
const CHART_API_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Seconds in a day.
const SECONDS_PER_DAY: i64 = 86_400;

/// Daily price source over Yahoo Finance's chart API.
#[derive(Debug)]
pub struct YahooPriceSource {
    client: reqwest::Client,
    base_url: String,
}

impl YahooPriceSource {
    /// Create a new source with default settings.
    ///
    /// # Errors
    /// Returns [`DataError::Network`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DataError::Network(e.to_string()))?;

        Ok(Self::with_client(client))
    }

    /// Create a new source with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: CHART_API_URL.to_string(),
        }
    }

    /// Point the source at a different chart endpoint (e.g. a test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the chart API URL for a request.
    ///
    /// The period runs from the first day's UTC midnight to the last second
    /// of the final day.
    fn build_url(&self, request: &FetchRequest) -> Result<Url> {
        let start_ts = Utc
            .from_utc_datetime(&request.range.start().and_time(NaiveTime::MIN))
            .timestamp();
        let end_ts = Utc
            .from_utc_datetime(&request.range.end().and_time(NaiveTime::MIN))
            .timestamp()
            + SECONDS_PER_DAY
            - 1;

        let invalid = || DataError::InvalidParameter(format!("base URL {}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .push(request.entity.as_str());
        url.query_pairs_mut()
            .append_pair("period1", &start_ts.to_string())
            .append_pair("period2", &end_ts.to_string())
            .append_pair("interval", "1d")
            .append_pair("includeAdjustedClose", "true");
        Ok(url)
    }
}

/// Parse a chart response body into daily bars.
fn parse_chart_response(symbol: &str, body: &str) -> Result<Vec<DailyBar>> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| DataError::Parse(e.to_string()))?;

    if let Some(error) = response.chart.error {
        return Err(DataError::Upstream {
            status: 0,
            message: error.to_string(),
        });
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(DataError::Parse(format!("no chart result for {symbol}")));
    };

    let timestamps = result.timestamp.unwrap_or_default();
    if timestamps.is_empty() {
        debug!(symbol, "No bars in range");
        return Ok(Vec::new());
    }

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::Parse("Missing quote data".to_string()))?;

    let adj_close = result
        .indicators
        .adjclose
        .and_then(|ac| ac.into_iter().next())
        .map(|ac| ac.adjclose)
        .unwrap_or_default();

    let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        // Halted or partial sessions come back with null prices.
        let Some(close) = at(&quote.close, i) else {
            continue;
        };
        let date = Utc
            .timestamp_opt(ts + offset, 0)
            .single()
            .map(|dt| dt.date_naive())
            .ok_or_else(|| DataError::Parse(format!("timestamp {ts} out of range")))?;

        bars.push(DailyBar {
            symbol: symbol.to_string(),
            date,
            open: at(&quote.open, i),
            high: at(&quote.high, i),
            low: at(&quote.low, i),
            close,
            adjusted_close: at(&adj_close, i),
            volume: at(&quote.volume, i),
        });
    }

    Ok(bars)
}

fn at<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).copied().flatten()
}

#[async_trait]
impl RemoteSource for YahooPriceSource {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Item>> {
        let url = self.build_url(request)?;
        debug!("Fetching daily bars: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ChartResponse>(&body)
                .ok()
                .and_then(|r| r.chart.error)
                .map_or(body, |e| e.to_string());
            return Err(DataError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let items = parse_chart_response(request.entity.as_str(), &body)?
            .into_iter()
            .map(DailyBar::into_item)
            .collect::<Result<Vec<_>>>()?;
        debug!(count = items.len(), "Fetched daily bars");
        Ok(items)
    }
}

/// One trading day's prices, as cached in each item's payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// Ticker symbol.
    pub symbol: String,
    /// Trading day in exchange-local time.
    pub date: NaiveDate,
    /// Opening price.
    pub open: Option<f64>,
    /// Session high.
    pub high: Option<f64>,
    /// Session low.
    pub low: Option<f64>,
    /// Closing price.
    pub close: f64,
    /// Close adjusted for splits and dividends.
    pub adjusted_close: Option<f64>,
    /// Shares traded.
    pub volume: Option<u64>,
}

impl DailyBar {
    /// Decodes a bar from a cached payload.
    ///
    /// # Errors
    /// Returns [`DataError::Parse`] if the payload is not a bar.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        Self::deserialize(payload).map_err(|e| DataError::Parse(e.to_string()))
    }

    fn into_item(self) -> Result<Item> {
        let day = self.date;
        let payload = serde_json::to_value(&self).map_err(|e| DataError::Parse(e.to_string()))?;
        Ok(Item::new(day, payload))
    }
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    result: Option<Vec<ChartData>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

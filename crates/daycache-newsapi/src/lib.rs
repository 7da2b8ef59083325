#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/daycache/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! News search remote source.
//!
//! This crate provides [`NewsApiSource`], a [`RemoteSource`] that searches a
//! NewsAPI-compatible `everything` endpoint for articles mentioning an entity
//! within a day range. Each article becomes an [`Item`] stamped with the UTC
//! calendar day of its `publishedAt` timestamp.
//!
//! A fetch walks result pages until the reported `totalResults` is reached.
//! If the results do not fit in the page budget the fetch fails instead of
//! returning a truncated list. The source neither throttles nor retries; wrap
//! it in the `daycache` fetcher for that.
//!
//! # Example
//!
//! ```no_run
//! use daycache_core::{DayRange, Entity, FetchRequest, RemoteSource};
//! use daycache_newsapi::NewsApiSource;
//!
//! # async fn example() -> daycache_core::Result<()> {
//! let source = NewsApiSource::new("my-api-key")?;
//! let request = FetchRequest::new(
//!     Entity::new("ACME")?,
//!     DayRange::parse("2024-01-01", "2024-01-31")?,
//! );
//!
//! let items = source.fetch(&request).await?;
//! println!("Fetched {} articles", items.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use daycache_core::{DataError, FetchRequest, Item, RemoteSource, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// NewsAPI base URL.
const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";

/// Articles requested per page (the API maximum).
const PAGE_SIZE: u32 = 100;

/// Pages requested per fetch before giving up.
const DEFAULT_MAX_PAGES: u32 = 5;

/// User agent for HTTP requests.
const USER_AGENT: &str = concat!("daycache-newsapi/", env!("CARGO_PKG_VERSION"));

/// Request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// News search source over a NewsAPI-compatible HTTP API.
#[derive(Debug)]
pub struct NewsApiSource {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: String,
    max_pages: u32,
}

impl NewsApiSource {
    /// Create a new source with default settings.
    ///
    /// # Errors
    /// Returns [`DataError::Network`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DataError::Network(e.to_string()))?;

        Ok(Self::with_client(client, api_key))
    }

    /// Create a new source with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            language: "en".to_string(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Point the source at a different API root (e.g. a proxy or test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Restrict results to a language (ISO 639-1). Defaults to `en`.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Caps how many result pages one fetch may request (at least one).
    ///
    /// A fetch whose results need more pages fails with
    /// [`DataError::Upstream`].
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Build the search URL for one page of a request.
    fn build_url(&self, request: &FetchRequest, page: u32) -> Result<Url> {
        let from = request.range.start().to_string();
        let to = request.range.end().to_string();
        let page_size = PAGE_SIZE.to_string();
        let page = page.to_string();

        Url::parse_with_params(
            &format!("{}/everything", self.base_url),
            &[
                ("q", request.entity.as_str()),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("language", self.language.as_str()),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
                ("page", page.as_str()),
            ],
        )
        .map_err(|e| DataError::InvalidParameter(format!("base URL {}: {e}", self.base_url)))
    }

    /// Requests one page of results.
    async fn fetch_page(&self, request: &FetchRequest, page: u32) -> Result<Page> {
        let url = self.build_url(request, page)?;

        let response = self
            .client
            .get(url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        if !status.is_success() {
            // Error bodies usually carry a code and message; fall back to the raw text.
            let message = serde_json::from_str::<SearchResponse>(&body)
                .map(|r| describe_error(&r.code, &r.message))
                .unwrap_or(body);
            return Err(DataError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        parse_response(&body)
    }
}

/// One page of search results.
#[derive(Debug)]
struct Page {
    /// Total matches reported by the API across all pages.
    total_results: usize,
    items: Vec<Item>,
}

/// Parse an `everything` response body into day-stamped items.
///
/// A body without `totalResults` is taken to be complete.
fn parse_response(body: &str) -> Result<Page> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| DataError::Parse(e.to_string()))?;

    if response.status != "ok" {
        return Err(DataError::Upstream {
            status: 0,
            message: describe_error(&response.code, &response.message),
        });
    }

    let total_results = response.total_results.unwrap_or(response.articles.len());
    let items = response
        .articles
        .into_iter()
        .map(|article| {
            let day = article.published_day()?;
            let payload =
                serde_json::to_value(&article).map_err(|e| DataError::Parse(e.to_string()))?;
            Ok(Item::new(day, payload))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Page {
        total_results,
        items,
    })
}

fn describe_error(code: &Option<String>, message: &Option<String>) -> String {
    match (code, message) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(code), None) => code.clone(),
        (None, Some(message)) => message.clone(),
        (None, None) => "unknown error".to_string(),
    }
}

#[async_trait]
impl RemoteSource for NewsApiSource {
    fn name(&self) -> &str {
        "newsapi"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Item>> {
        debug!(entity = %request.entity, range = %request.range, "Searching news");

        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let Page {
                total_results,
                items: batch,
            } = self.fetch_page(request, page).await?;
            let received = batch.len();
            items.extend(batch);

            if items.len() >= total_results {
                break;
            }
            if received == 0 {
                return Err(DataError::Upstream {
                    status: 0,
                    message: format!(
                        "page {page} was empty after {} of {total_results} articles",
                        items.len()
                    ),
                });
            }
            if page >= self.max_pages {
                return Err(DataError::Upstream {
                    status: 0,
                    message: format!(
                        "{total_results} articles do not fit in {} pages of {PAGE_SIZE}",
                        self.max_pages
                    ),
                });
            }
            page += 1;
        }

        debug!(count = items.len(), pages = page, "Fetched articles");
        Ok(items)
    }
}

// ============================================================================
// NewsAPI Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    total_results: Option<usize>,
    #[serde(default)]
    articles: Vec<Article>,
}

/// Publisher of an article.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSource {
    /// Publisher identifier, if the API knows one.
    pub id: Option<String>,
    /// Publisher display name.
    pub name: Option<String>,
}

/// One news article, as cached in each item's payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Publisher.
    #[serde(default)]
    pub source: ArticleSource,
    /// Author byline.
    pub author: Option<String>,
    /// Headline.
    pub title: Option<String>,
    /// Summary.
    pub description: Option<String>,
    /// Link to the article.
    pub url: Option<String>,
    /// Publication timestamp (RFC 3339, e.g. `2024-01-01T12:00:00Z`).
    pub published_at: String,
    /// Truncated article body.
    pub content: Option<String>,
}

impl Article {
    /// Decodes an article from a cached payload.
    ///
    /// # Errors
    /// Returns [`DataError::Parse`] if the payload is not an article.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        Self::deserialize(payload).map_err(|e| DataError::Parse(e.to_string()))
    }

    /// UTC calendar day of `published_at`.
    ///
    /// # Errors
    /// Returns [`DataError::Parse`] if the timestamp is malformed.
    pub fn published_day(&self) -> Result<chrono::NaiveDate> {
        DateTime::parse_from_rfc3339(&self.published_at)
            .map(|dt| dt.with_timezone(&Utc).date_naive())
            .map_err(|e| {
                DataError::Parse(format!("publishedAt {:?}: {e}", self.published_at))
            })
    }
}

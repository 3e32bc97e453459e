//! Tavily search client (`POST /search`).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SearchError, SearchProvider, SearchResult};
use crate::config::SearchConfig;
use crate::providers::sanitize_http_error_body;

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Search request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct TavilyRequest<'a> {
    /// API key (Tavily takes it in the body).
    pub api_key: &'a str,
    /// Query text.
    pub query: &'a str,
    /// `basic` or `advanced`.
    pub search_depth: &'a str,
    /// Domains to restrict results to.
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub include_domains: &'a [String],
    /// Result count upper bound.
    pub max_results: u32,
}

/// Search response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct TavilyResponse {
    /// Ranked hits.
    #[serde(default)]
    pub results: Vec<TavilyHit>,
}

/// One hit as returned by Tavily.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct TavilyHit {
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Page URL.
    #[serde(default)]
    pub url: String,
    /// Extracted content.
    #[serde(default)]
    pub content: String,
}

/// Parse a Tavily response body into search results.
///
/// # Errors
///
/// Returns `SearchError::Parse` if the body is not valid JSON.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<Vec<SearchResult>, SearchError> {
    let resp: TavilyResponse =
        serde_json::from_str(body).map_err(|e| SearchError::Parse(e.to_string()))?;
    Ok(resp
        .results
        .into_iter()
        .map(|hit| SearchResult {
            title: hit.title,
            url: hit.url,
            snippet: hit.content,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Tavily-backed [`SearchProvider`].
pub struct TavilyClient {
    base_url: String,
    api_key: String,
    search_depth: String,
    include_domains: Vec<String>,
    max_results: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for TavilyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"__REDACTED__")
            .field("search_depth", &self.search_depth)
            .field("include_domains", &self.include_domains)
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl TavilyClient {
    /// Build a client from the `[search]` config section.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Request` if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig, api_key: String) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key,
            search_depth: config.search_depth.clone(),
            include_domains: config.include_domains.clone(),
            max_results: config.max_results,
            client,
        })
    }
}

#[async_trait::async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let body = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: &self.search_depth,
            include_domains: &self.include_domains,
            max_results: self.max_results,
        };
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(SearchError::HttpStatus {
                status: status.as_u16(),
                body: sanitize_http_error_body(&text),
            });
        }

        let results = parse_response(&text)?;
        debug!(results = results.len(), "search completed");
        Ok(results)
    }
}

//! Web search capability.
//!
//! The advisor treats search as an opaque collaborator: a query string goes
//! in, a ranked list of [`SearchResult`] comes out. [`tavily::TavilyClient`]
//! is the production backend; [`classifier::SearchClassifier`] decides when a
//! query is worth searching at all.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod classifier;
pub mod tavily;

/// Upper bound on results forwarded to the caller and embedded in prompts.
pub const MAX_FORWARDED_RESULTS: usize = 3;

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Page title.
    pub title: String,
    /// Source URL.
    pub url: String,
    /// Extracted snippet of page content.
    pub snippet: String,
}

/// Errors returned by search backends.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// HTTP transport failure (includes timeouts).
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Search backend responded with an error status.
    #[error("search returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// Response did not match the expected schema.
    #[error("search response parse error: {0}")]
    Parse(String),
}

/// Ranked web search.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query` and return results in rank order. An empty list is a valid
    /// answer.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport, status, or parse failure.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

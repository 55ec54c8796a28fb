//! Page fetching capability
//!
//! The crawl core never talks to the registry site directly; it depends on
//! the `PageFetcher` capability surface. Each crawl job owns exactly one
//! fetcher, which in turn owns one registry session - the surface is not safe
//! to share between jobs.
//!
//! One concrete implementation ships with the crate: `HttpFetcher`, which
//! drives the registry's search form over plain HTTP with a cookie-holding
//! client.

mod http;

pub use http::{build_http_client, HttpFetcher};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while driving the registry session
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Expected element did not appear: {selector}")]
    MissingElement { selector: String },

    #[error("Session is not configured for a category yet")]
    SessionNotReady,

    #[error("Invalid registry URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// Capability surface for driving one registry search session
///
/// Methods take `&mut self`: a session is a single stateful conversation with
/// the site and is never used concurrently.
#[async_trait]
pub trait PageFetcher: Send {
    /// Opens the registry search form, establishing the session
    async fn navigate_to_search_form(&mut self) -> Result<(), FetchError>;

    /// Configures the session for one category and status filter
    async fn configure_for_category(
        &mut self,
        category: &str,
        status_filter: &str,
    ) -> Result<(), FetchError>;

    /// Attempts to raise the per-page result cap to its maximum supported value
    ///
    /// Called once, opportunistically, after the first successful result view.
    /// Failure is non-fatal to the crawl.
    async fn set_page_size_if_possible(&mut self) -> Result<(), FetchError>;

    /// Submits a query for the given prefix and returns the result page content
    async fn submit_query(&mut self, prefix: &str) -> Result<String, FetchError>;

    /// Re-fetches the current page content without changing the query
    ///
    /// The captcha gate uses this to re-check on fresh content rather than a
    /// stale snapshot.
    async fn refresh(&mut self) -> Result<String, FetchError>;

    /// Reads the total match count from a result page
    ///
    /// `None` means the page carried no result-count signal, which the crawl
    /// classifies as zero matches.
    fn current_result_count(&self, page_content: &str) -> Option<u64>;
}

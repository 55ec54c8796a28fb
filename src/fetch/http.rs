//! HTTP registry session fetcher
//!
//! Drives the registry's search form directly over HTTP: one cookie-holding
//! client per fetcher, form submissions for queries, and an opportunistic
//! page-size raise. The count signal is read from the pager banner, whose
//! text ends with ". . . of N results"-style wording; the count is the
//! second-to-last whitespace token.

use crate::config::RegistryConfig;
use crate::crawler::CaptchaGate;
use crate::fetch::{FetchError, PageFetcher};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

// Form field names used by the registry's search form
const FIELD_QUERY: &str = "QueryString";
const FIELD_CATEGORY: &str = "EntitySubTypeCode";
const FIELD_STATUS: &str = "Status";
const FIELD_PAGE_SIZE: &str = "PageSize";

/// Builds the HTTP client used for registry sessions
///
/// The cookie store is what makes the session a session: the registry tracks
/// the configured search on the server side. `result_timeout` bounds the wait
/// for any single results view.
pub fn build_http_client(result_timeout: Duration) -> Result<Client, reqwest::Error> {
    let user_agent = format!("registry-dredge/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .cookie_store(true)
        .timeout(result_timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// A `PageFetcher` that drives the registry search form over HTTP
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
    page_size_value: String,
    banner_selector: Selector,
    results_selector: Selector,
    results_selector_source: String,
    category: Option<(String, String)>,
    last_prefix: Option<String>,
}

impl HttpFetcher {
    /// Creates a fetcher for the registry described by `registry`
    pub fn new(registry: &RegistryConfig, result_timeout: Duration) -> Result<Self, FetchError> {
        let base_url = Url::parse(&registry.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", registry.base_url, e)))?;

        let banner_selector = Selector::parse(&registry.selectors.pager_banner)
            .map_err(|_| FetchError::Selector(registry.selectors.pager_banner.clone()))?;
        let results_selector = Selector::parse(&registry.selectors.results_container)
            .map_err(|_| FetchError::Selector(registry.selectors.results_container.clone()))?;

        let client = build_http_client(result_timeout)?;

        Ok(Self {
            client,
            base_url,
            page_size_value: registry.page_size_value.clone(),
            banner_selector,
            results_selector,
            results_selector_source: registry.selectors.results_container.clone(),
            category: None,
            last_prefix: None,
        })
    }

    /// Submits the search form with the session's category, status filter and
    /// the given prefix, plus any extra fields
    async fn post_search(
        &self,
        prefix: &str,
        extra: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let (category, status) = self.category.as_ref().ok_or(FetchError::SessionNotReady)?;

        let mut form: Vec<(&str, &str)> = vec![
            (FIELD_QUERY, prefix),
            (FIELD_CATEGORY, category),
            (FIELD_STATUS, status),
        ];
        form.extend_from_slice(extra);

        let response = self
            .client
            .post(self.base_url.clone())
            .form(&form)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;

        // The results view must have loaded, even for zero-match queries.
        // A verification interstitial also lacks it, though: that page is
        // handed back intact so the captcha gate can hold the pipeline. Only
        // a clean page without the results view is fatal to the job.
        let document = Html::parse_document(&body);
        if document.select(&self.results_selector).next().is_none()
            && !CaptchaGate::is_blocked(&body)
        {
            return Err(FetchError::MissingElement {
                selector: self.results_selector_source.clone(),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn navigate_to_search_form(&mut self) -> Result<(), FetchError> {
        self.client
            .get(self.base_url.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn configure_for_category(
        &mut self,
        category: &str,
        status_filter: &str,
    ) -> Result<(), FetchError> {
        self.category = Some((category.to_string(), status_filter.to_string()));
        Ok(())
    }

    async fn set_page_size_if_possible(&mut self) -> Result<(), FetchError> {
        let prefix = self
            .last_prefix
            .clone()
            .ok_or(FetchError::SessionNotReady)?;
        let value = self.page_size_value.clone();
        self.post_search(&prefix, &[(FIELD_PAGE_SIZE, value.as_str())])
            .await?;
        Ok(())
    }

    async fn submit_query(&mut self, prefix: &str) -> Result<String, FetchError> {
        let body = self.post_search(prefix, &[]).await?;
        self.last_prefix = Some(prefix.to_string());
        Ok(body)
    }

    async fn refresh(&mut self) -> Result<String, FetchError> {
        match self.last_prefix.clone() {
            Some(prefix) => self.post_search(&prefix, &[]).await,
            None => {
                // No query submitted yet: re-open the search form itself
                let response = self
                    .client
                    .get(self.base_url.clone())
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(response.text().await?)
            }
        }
    }

    fn current_result_count(&self, page_content: &str) -> Option<u64> {
        let document = Html::parse_document(page_content);
        let banner = document.select(&self.banner_selector).next()?;
        let text: String = banner.text().collect();
        // Banner wording: "... showing 1 to 25 of 450 results" - the count is
        // the second-to-last token
        text.split_whitespace().rev().nth(1)?.parse().ok()
    }
}

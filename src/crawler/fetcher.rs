//! HTTP page fetcher implementation
//!
//! This module handles every request sent to the listing service:
//! - Building the HTTP client with a descriptive user agent
//! - Building the listing URL for a page number
//! - Retrying transient failures with exponential backoff
//! - Spacing requests with a [`Throttle`]
//! - Classifying responses into a [`PageOutcome`]

use crate::config::{Config, UserAgentConfig};
use crate::crawler::parser::ItemExtractor;
use crate::crawler::retry::{RetryDecision, RetryPolicy};
use crate::crawler::throttle::Throttle;
use crate::state::{FailureKind, PageOutcome, PageResult};
use crate::ScanError;
use num_bigint::BigInt;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Source of page results
///
/// The crawl driver, boundary locator and probes only ever see this trait, so
/// tests can substitute scripted fetchers for the network.
pub trait PageFetcher {
    /// Fetches one page; never fails outright, failures are part of the result
    fn fetch(&self, page: &BigInt) -> impl Future<Output = PageResult> + Send;
}

/// The listing URL and the query parameter that selects a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEndpoint {
    base: Url,
    page_param: String,
}

impl ListingEndpoint {
    pub fn new(base: Url, page_param: impl Into<String>) -> Self {
        Self {
            base,
            page_param: page_param.into(),
        }
    }

    /// Builds the URL for `page`, keeping any query already on the base URL
    pub fn page_url(&self, page: &BigInt) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair(&self.page_param, &page.to_string());
        url
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use wrapscan::config::UserAgentConfig;
/// use wrapscan::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "Wrapscan".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches listing pages over HTTP
///
/// # Response Handling
///
/// | Condition | Outcome | Retried |
/// |-----------|---------|---------|
/// | HTTP 200 with identifiers | Success | - |
/// | HTTP 200 without identifiers | EmptySuccess | - |
/// | HTTP 200 error page | Failure(ErrorPage) | no |
/// | HTTP 404 | Failure(NotFound) | no |
/// | HTTP 5xx | Failure(HttpStatus) | yes |
/// | Other status | Failure(HttpStatus) | no |
/// | Timeout | Failure(Timeout) | yes |
/// | Connection error | Failure(Connection) | yes |
#[derive(Debug)]
pub struct HttpPageFetcher {
    client: Client,
    endpoint: ListingEndpoint,
    extractor: ItemExtractor,
    retry: RetryPolicy,
    throttle: Throttle,
}

impl HttpPageFetcher {
    pub fn new(
        client: Client,
        endpoint: ListingEndpoint,
        extractor: ItemExtractor,
        retry: RetryPolicy,
        min_interval: Duration,
    ) -> Self {
        Self {
            client,
            endpoint,
            extractor,
            retry,
            throttle: Throttle::new(min_interval),
        }
    }

    /// Builds a fetcher from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self, ScanError> {
        let base = Url::parse(&config.service.base_url).map_err(|e| {
            crate::ConfigError::InvalidUrl(format!("Invalid base_url: {}", e))
        })?;
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawl.request_timeout_secs),
        )?;
        let extractor =
            ItemExtractor::new(&config.service.item_tag, &config.service.item_extension)?;
        let retry = RetryPolicy::new(
            config.crawl.max_attempts,
            Duration::from_millis(config.crawl.retry_base_delay_ms),
        );

        Ok(Self::new(
            client,
            ListingEndpoint::new(base, config.service.page_param.clone()),
            extractor,
            retry,
            Duration::from_millis(config.crawl.request_delay_ms),
        ))
    }

    /// Sends a single request and classifies the response
    async fn fetch_once(&self, url: &Url) -> PageOutcome {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return PageOutcome::Failure(classify_request_error(&e)),
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return PageOutcome::Failure(FailureKind::NotFound);
        }
        if status != StatusCode::OK {
            return PageOutcome::Failure(FailureKind::HttpStatus(status.as_u16()));
        }

        match response.text().await {
            Ok(body) => self.extractor.classify_body(&body),
            Err(e) if e.is_timeout() => PageOutcome::Failure(FailureKind::Timeout),
            Err(e) => PageOutcome::Failure(FailureKind::Body(e.to_string())),
        }
    }
}

impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, page: &BigInt) -> PageResult {
        let url = self.endpoint.page_url(page);
        let mut retry = self.retry.start();

        loop {
            self.throttle.wait().await;
            let outcome = self.fetch_once(&url).await;

            let failure = match outcome.failure() {
                Some(failure) => failure,
                None => {
                    tracing::debug!("Page {}: {} items", page, outcome.item_count());
                    return PageResult::new(page.clone(), outcome);
                }
            };

            match retry.on_failure(failure) {
                RetryDecision::Retry { attempt, delay } => {
                    tracing::warn!(
                        "Page {} failed ({}), retrying in {:?} (attempt {})",
                        page,
                        failure,
                        delay,
                        attempt
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    tracing::debug!(
                        "Page {} failed after {} attempt(s): {}",
                        page,
                        retry.attempt(),
                        failure
                    );
                    return PageResult::new(page.clone(), outcome);
                }
            }
        }
    }
}

/// Maps a transport-level error onto the failure taxonomy
fn classify_request_error(error: &reqwest::Error) -> FailureKind {
    if error.is_timeout() {
        FailureKind::Timeout
    } else if error.is_body() || error.is_decode() {
        FailureKind::Body(error.to_string())
    } else {
        FailureKind::Connection(error.to_string())
    }
}

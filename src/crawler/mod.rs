//! Crawler module for page fetching and range discovery
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic and request spacing
//! - HTML parsing and identifier extraction
//! - Boundary search around a known-good anchor page
//! - The sequential, resumable crawl driver
//! - Exploratory probes against a finished crawl

mod boundary;
mod driver;
mod fetcher;
mod parser;
mod probe;
mod retry;
mod throttle;

pub use boundary::{
    BoundaryLocator, BoundaryOutcome, BoundaryReport, Confirmation, Direction, LocatorError,
    ProbeRecord, SearchPhase,
};
pub use driver::{CrawlDriver, CrawlReport, CrawlSettings, CrawlStatus};
pub use fetcher::{build_http_client, HttpPageFetcher, ListingEndpoint, PageFetcher};
pub use parser::ItemExtractor;
pub use probe::{probe_pages, ProbeReport, ProbeSummary};
pub use retry::{RetryDecision, RetryPolicy, RetryState};
pub use throttle::Throttle;

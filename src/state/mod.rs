//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageResult` / `PageOutcome` / `FailureKind`: what one page fetch produced
//! - `ItemId`: a canonical document identifier
//! - `ContentFingerprint` / `FingerprintIndex`: order-independent page digests
//!   and the first page that produced each one
//! - `PageClassification`: the closed set of verdicts a page can receive
//! - `CrawlState`: the resumable aggregate persisted in checkpoints
//! - `Baseline`: a read-only snapshot of a crawl handed to exploratory probes

mod baseline;
mod classification;
mod crawl_state;
mod fingerprint;
mod item;
mod page_result;

pub use baseline::Baseline;
pub use classification::PageClassification;
pub use crawl_state::{CrawlState, PageRecord};
pub use fingerprint::{ContentFingerprint, FingerprintIndex, Verdict, EMPTY_FINGERPRINT};
pub use item::ItemId;
pub use page_result::{bigint_string, FailureKind, PageOutcome, PageResult};

use thiserror::Error;

/// Errors raised when a page result cannot be applied to the crawl state
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Page {page} already has a non-failed record")]
    AlreadyRecorded { page: i64 },

    #[error("Crawl state is inconsistent: {0}")]
    Inconsistent(String),
}

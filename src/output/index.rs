//! The pagination index: every page record plus a summary of wraps,
//! redundant pages and failures

use crate::crawler::CrawlStatus;
use crate::state::{CrawlState, FailureKind, PageRecord};
use crate::storage::write_json;
use crate::ScanError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Run-level facts written at the top of the index
#[derive(Debug, Clone, Serialize)]
pub struct IndexMetadata {
    pub started_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    pub start_page: i64,
    pub end_page: i64,
    pub cursor: Option<i64>,
    pub status: CrawlStatus,
    pub total_pages: usize,
    pub total_unique_items: usize,
    pub total_requests: u64,
    pub total_errors: u64,
}

impl IndexMetadata {
    pub fn new(
        state: &CrawlState,
        start_page: i64,
        end_page: i64,
        status: CrawlStatus,
        config_hash: Option<String>,
    ) -> Self {
        Self {
            started_at: state.started_at(),
            generated_at: Utc::now(),
            config_hash,
            start_page,
            end_page,
            cursor: state.cursor(),
            status,
            total_pages: state.page_records().len(),
            total_unique_items: state.seen_items().len(),
            total_requests: state.total_requests(),
            total_errors: state.total_errors(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrapEntry {
    pub page: i64,
    pub origin: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub page: i64,
    pub reason: FailureKind,
}

/// Pages grouped by classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub new_pages: usize,
    pub true_wraps: Vec<WrapEntry>,
    pub redundant_pages: Vec<i64>,
    pub empty_pages: Vec<i64>,
    pub failed_pages: Vec<FailedEntry>,
}

impl IndexSummary {
    pub fn from_state(state: &CrawlState) -> Self {
        use crate::state::PageClassification::*;

        let mut summary = Self::default();
        for (page, record) in state.page_records() {
            match &record.classification {
                New { .. } => summary.new_pages += 1,
                TrueWrap { origin } => summary.true_wraps.push(WrapEntry {
                    page: *page,
                    origin: *origin,
                }),
                Redundant => summary.redundant_pages.push(*page),
                Empty => summary.empty_pages.push(*page),
                Failed { reason } => summary.failed_pages.push(FailedEntry {
                    page: *page,
                    reason: reason.clone(),
                }),
            }
        }
        summary
    }
}

/// Glossary written into the index so the file stands on its own
const DEFINITIONS: [(&str, &str); 5] = [
    ("new", "Page listing at least one identifier not seen on any earlier page"),
    ("true_wrap", "Page with exactly the same identifier set as an earlier page"),
    (
        "redundant",
        "Page whose identifiers were all seen before, but not as any single earlier page",
    ),
    ("empty", "Page that answered with no identifiers"),
    ("failed", "Page that could not be fetched or returned an error page"),
];

/// The full index document
#[derive(Debug, Serialize)]
pub struct PaginationIndex<'a> {
    pub metadata: IndexMetadata,
    pub definitions: BTreeMap<&'static str, &'static str>,
    pub summary: IndexSummary,
    pub pages: &'a BTreeMap<i64, PageRecord>,
}

impl<'a> PaginationIndex<'a> {
    pub fn build(state: &'a CrawlState, metadata: IndexMetadata) -> Self {
        Self {
            metadata,
            definitions: DEFINITIONS.into_iter().collect(),
            summary: IndexSummary::from_state(state),
            pages: state.page_records(),
        }
    }
}

/// Writes the pagination index for `state` to `path`
pub fn write_index(
    path: &Path,
    state: &CrawlState,
    metadata: IndexMetadata,
) -> Result<(), ScanError> {
    let index = PaginationIndex::build(state, metadata);
    write_json(path, &index)?;
    tracing::debug!("Wrote pagination index to {}", path.display());
    Ok(())
}

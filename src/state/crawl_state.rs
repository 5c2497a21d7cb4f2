//! The resumable aggregate of a crawl
//!
//! `CrawlState` is the only thing a checkpoint contains. It is mutated one
//! page at a time through [`CrawlState::apply`], which classifies and commits
//! a page in a single in-memory step.

use crate::state::{
    Baseline, ContentFingerprint, FingerprintIndex, ItemId, PageClassification, PageOutcome,
    StateError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Everything recorded about one visited page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub classification: PageClassification,
    pub item_count: usize,
    pub new_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<ContentFingerprint>,
    pub timestamp: DateTime<Utc>,
    /// All items listed on the page, sorted
    #[serde(default)]
    pub items: Vec<ItemId>,
}

/// Durable record of a crawl: seen items, per-page records and the
/// fingerprint index
///
/// # Invariants
///
/// - The sum of `new_count` over all records equals the number of seen items
/// - A `TrueWrap` page never contributes to the seen set
/// - Every page referenced by the fingerprint index has a record
/// - `failed_pages` holds exactly the pages whose record is `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlState {
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cursor: Option<i64>,
    seen_items: BTreeSet<ItemId>,
    page_records: BTreeMap<i64, PageRecord>,
    fingerprint_index: FingerprintIndex,
    #[serde(default)]
    failed_pages: BTreeSet<i64>,
    #[serde(default)]
    consecutive_without_new: u32,
    #[serde(default)]
    total_requests: u64,
    #[serde(default)]
    total_errors: u64,
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlState {
    /// Creates an empty state for a fresh crawl
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            updated_at: now,
            cursor: None,
            seen_items: BTreeSet::new(),
            page_records: BTreeMap::new(),
            fingerprint_index: FingerprintIndex::new(),
            failed_pages: BTreeSet::new(),
            consecutive_without_new: 0,
            total_requests: 0,
            total_errors: 0,
        }
    }

    /// Classifies a page outcome and commits it
    ///
    /// A page may be applied again only while its existing record is
    /// `Failed`; this is how retry rounds replace failures without ever
    /// counting a page twice.
    ///
    /// # Effects by classification
    ///
    /// | Classification | Seen set | Fingerprint index |
    /// |----------------|----------|-------------------|
    /// | New | new items added | recorded |
    /// | Redundant | unchanged | recorded |
    /// | Empty | unchanged | empty marker recorded if first |
    /// | TrueWrap | unchanged | unchanged |
    /// | Failed | unchanged | unchanged |
    pub fn apply(
        &mut self,
        page: i64,
        outcome: PageOutcome,
    ) -> Result<PageClassification, StateError> {
        if let Some(existing) = self.page_records.get(&page) {
            if !existing.classification.is_failed() {
                return Err(StateError::AlreadyRecorded { page });
            }
        }

        self.total_requests += 1;
        let timestamp = Utc::now();

        let record = match outcome {
            PageOutcome::Failure(reason) => {
                self.total_errors += 1;
                self.failed_pages.insert(page);
                PageRecord {
                    classification: PageClassification::Failed { reason },
                    item_count: 0,
                    new_count: 0,
                    fingerprint: None,
                    timestamp,
                    items: Vec::new(),
                }
            }
            PageOutcome::EmptySuccess => self.commit_items(page, BTreeSet::new(), timestamp),
            PageOutcome::Success(items) => self.commit_items(page, items, timestamp),
        };

        let classification = record.classification.clone();
        self.page_records.insert(page, record);
        self.cursor = Some(self.cursor.map_or(page, |cursor| cursor.max(page)));
        self.updated_at = timestamp;

        Ok(classification)
    }

    fn commit_items(
        &mut self,
        page: i64,
        items: BTreeSet<ItemId>,
        timestamp: DateTime<Utc>,
    ) -> PageRecord {
        let verdict = self.fingerprint_index.classify(&items, &self.seen_items);

        match &verdict.classification {
            PageClassification::New { .. } => {
                self.seen_items.extend(verdict.new_items.iter().cloned());
                self.fingerprint_index.record(verdict.fingerprint.clone(), page);
                self.consecutive_without_new = 0;
            }
            PageClassification::Redundant | PageClassification::Empty => {
                self.fingerprint_index.record(verdict.fingerprint.clone(), page);
                self.consecutive_without_new += 1;
            }
            PageClassification::TrueWrap { .. } => {
                self.consecutive_without_new += 1;
            }
            PageClassification::Failed { .. } => {}
        }

        self.failed_pages.remove(&page);

        PageRecord {
            new_count: verdict.classification.new_count(),
            classification: verdict.classification,
            item_count: items.len(),
            fingerprint: Some(verdict.fingerprint),
            timestamp,
            items: items.into_iter().collect(),
        }
    }

    /// Checks every invariant, as done after loading a checkpoint
    pub fn validate(&self) -> Result<(), StateError> {
        let new_total: usize = self.page_records.values().map(|r| r.new_count).sum();
        if new_total != self.seen_items.len() {
            return Err(StateError::Inconsistent(format!(
                "page records account for {} new items but {} items are seen",
                new_total,
                self.seen_items.len()
            )));
        }

        for (page, record) in &self.page_records {
            if record.new_count != record.classification.new_count() {
                return Err(StateError::Inconsistent(format!(
                    "page {} is {} but records {} new items",
                    page,
                    record.classification.label(),
                    record.new_count
                )));
            }
            if record.classification.is_failed() != self.failed_pages.contains(page) {
                return Err(StateError::Inconsistent(format!(
                    "page {} failure status disagrees with the retry list",
                    page
                )));
            }
        }

        for (fingerprint, page) in self.fingerprint_index.iter() {
            if !self.page_records.contains_key(&page) {
                return Err(StateError::Inconsistent(format!(
                    "fingerprint {} points at unrecorded page {}",
                    fingerprint, page
                )));
            }
        }

        if let Some(page) = self.failed_pages.iter().find(|p| !self.page_records.contains_key(p)) {
            return Err(StateError::Inconsistent(format!(
                "retry list contains unrecorded page {}",
                page
            )));
        }

        Ok(())
    }

    /// Returns a read-only view for exploratory probes
    pub fn snapshot(&self) -> Baseline {
        Baseline::new(self.seen_items.clone(), self.fingerprint_index.clone())
    }

    /// Marks the state as persisted now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// The first page a resumed run should visit
    ///
    /// Returns `None` when the cursor already sits at the top of the page
    /// range and there is no next page.
    pub fn next_page(&self, start: i64) -> Option<i64> {
        match self.cursor {
            Some(cursor) => cursor.checked_add(1),
            None => Some(start),
        }
    }

    pub fn cursor(&self) -> Option<i64> {
        self.cursor
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn seen_items(&self) -> &BTreeSet<ItemId> {
        &self.seen_items
    }

    pub fn page_records(&self) -> &BTreeMap<i64, PageRecord> {
        &self.page_records
    }

    pub fn record(&self, page: i64) -> Option<&PageRecord> {
        self.page_records.get(&page)
    }

    pub fn fingerprint_index(&self) -> &FingerprintIndex {
        &self.fingerprint_index
    }

    pub fn failed_pages(&self) -> &BTreeSet<i64> {
        &self.failed_pages
    }

    pub fn consecutive_without_new(&self) -> u32 {
        self.consecutive_without_new
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors
    }

    /// Pages that exactly repeat an earlier page, paired with that page
    pub fn true_wraps(&self) -> Vec<(i64, i64)> {
        self.page_records
            .iter()
            .filter_map(|(page, record)| record.classification.wraps_to().map(|origin| (*page, origin)))
            .collect()
    }
}

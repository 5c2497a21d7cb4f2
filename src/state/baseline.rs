//! Read-only crawl snapshots for exploratory probes

use crate::state::{ContentFingerprint, CrawlState, FingerprintIndex, ItemId, Verdict};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A frozen view of a crawl's seen items and fingerprint index
///
/// Probes classify pages against a baseline plus their own local seen set;
/// the baseline itself is never extended.
#[derive(Debug, Clone)]
pub struct Baseline {
    seen: Arc<BTreeSet<ItemId>>,
    index: Arc<FingerprintIndex>,
}

impl Baseline {
    pub fn new(seen: BTreeSet<ItemId>, index: FingerprintIndex) -> Self {
        Self {
            seen: Arc::new(seen),
            index: Arc::new(index),
        }
    }

    pub fn empty() -> Self {
        Self::new(BTreeSet::new(), FingerprintIndex::new())
    }

    pub fn contains(&self, item: &ItemId) -> bool {
        self.seen.contains(item)
    }

    pub fn origin_of(&self, fingerprint: &ContentFingerprint) -> Option<i64> {
        self.index.origin_of(fingerprint)
    }

    pub fn item_count(&self) -> usize {
        self.seen.len()
    }

    pub fn fingerprint_count(&self) -> usize {
        self.index.len()
    }

    /// Classifies items against the baseline and a caller-owned seen set
    pub fn classify(&self, items: &BTreeSet<ItemId>, local_seen: &BTreeSet<ItemId>) -> Verdict {
        self.index
            .classify_with(items, |item| self.seen.contains(item) || local_seen.contains(item))
    }
}

impl From<&CrawlState> for Baseline {
    fn from(state: &CrawlState) -> Self {
        state.snapshot()
    }
}

//! Content fingerprints and the loop-detection index
//!
//! A fingerprint is a SHA-256 digest of a page's sorted, deduplicated
//! identifier set, so two pages listing the same items in a different order
//! share a fingerprint. The index remembers the first page that produced each
//! fingerprint and is never overwritten.

use crate::state::{ItemId, PageClassification};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Pseudo-fingerprint shared by every page that lists no items
pub const EMPTY_FINGERPRINT: &str = "empty";

/// Order-independent digest of one page's identifier set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Computes the fingerprint of an item set
    pub fn of(items: &BTreeSet<ItemId>) -> Self {
        if items.is_empty() {
            return Self::empty();
        }

        let mut hasher = Sha256::new();
        for (position, item) in items.iter().enumerate() {
            if position > 0 {
                hasher.update(b"|");
            }
            hasher.update(item.as_str().as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn empty() -> Self {
        Self(EMPTY_FINGERPRINT.to_string())
    }

    pub fn is_empty_marker(&self) -> bool {
        self.0 == EMPTY_FINGERPRINT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The result of classifying a page without committing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub classification: PageClassification,
    pub fingerprint: ContentFingerprint,
    /// Items absent from the seen set; only meaningful for `New`
    pub new_items: Vec<ItemId>,
}

/// Append-only mapping from fingerprint to the first page that produced it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintIndex {
    origins: BTreeMap<ContentFingerprint, i64>,
}

impl FingerprintIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin_of(&self, fingerprint: &ContentFingerprint) -> Option<i64> {
        self.origins.get(fingerprint).copied()
    }

    /// Records a fingerprint against a page
    ///
    /// Returns false, leaving the index untouched, if the fingerprint is
    /// already known.
    pub fn record(&mut self, fingerprint: ContentFingerprint, page: i64) -> bool {
        if self.origins.contains_key(&fingerprint) {
            return false;
        }
        self.origins.insert(fingerprint, page);
        true
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ContentFingerprint, i64)> {
        self.origins.iter().map(|(fingerprint, page)| (fingerprint, *page))
    }

    /// Classifies a page's items against a seen set
    ///
    /// This is a pure query: neither the index nor `seen` changes, so asking
    /// twice gives the same answer.
    pub fn classify(&self, items: &BTreeSet<ItemId>, seen: &BTreeSet<ItemId>) -> Verdict {
        self.classify_with(items, |item| seen.contains(item))
    }

    /// Classifies a page's items using an arbitrary membership test
    ///
    /// # Rules
    ///
    /// 1. No items: `Empty`, with the shared empty pseudo-fingerprint
    /// 2. Fingerprint already indexed: `TrueWrap`, even if some items are unseen
    /// 3. At least one unseen item: `New`
    /// 4. Otherwise: `Redundant`
    pub fn classify_with<F>(&self, items: &BTreeSet<ItemId>, is_seen: F) -> Verdict
    where
        F: Fn(&ItemId) -> bool,
    {
        if items.is_empty() {
            return Verdict {
                classification: PageClassification::Empty,
                fingerprint: ContentFingerprint::empty(),
                new_items: Vec::new(),
            };
        }

        let fingerprint = ContentFingerprint::of(items);
        if let Some(origin) = self.origin_of(&fingerprint) {
            return Verdict {
                classification: PageClassification::TrueWrap { origin },
                fingerprint,
                new_items: Vec::new(),
            };
        }

        let new_items: Vec<ItemId> = items.iter().filter(|item| !is_seen(item)).cloned().collect();
        let classification = if new_items.is_empty() {
            PageClassification::Redundant
        } else {
            PageClassification::New {
                count: new_items.len(),
            }
        };

        Verdict {
            classification,
            fingerprint,
            new_items,
        }
    }
}

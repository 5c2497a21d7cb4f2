//! Exploratory probes against a finished crawl
//!
//! A probe fetches an arbitrary list of pages (typically far outside the
//! crawled range) and classifies each one against a [`Baseline`] snapshot.
//! Items found by earlier probes in the same run count as seen, but nothing
//! is ever written back into the baseline.

use crate::crawler::fetcher::PageFetcher;
use crate::state::{
    bigint_string, Baseline, ContentFingerprint, ItemId, PageClassification, PageOutcome,
};
use num_bigint::BigInt;
use serde::Serialize;
use std::collections::BTreeSet;

/// What one probed page turned out to be
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    #[serde(with = "bigint_string")]
    pub page: BigInt,
    pub classification: PageClassification,
    pub item_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<ContentFingerprint>,
    /// Items seen neither in the baseline nor on an earlier probe
    pub new_items: Vec<ItemId>,
}

/// All probe results of one run
#[derive(Debug, Clone, Serialize)]
pub struct ProbeSummary {
    pub baseline_items: usize,
    pub baseline_fingerprints: usize,
    pub reports: Vec<ProbeReport>,
    pub new_items: BTreeSet<ItemId>,
}

impl ProbeSummary {
    pub fn failed_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.classification.is_failed())
            .count()
    }

    pub fn wrap_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.classification.wraps_to().is_some())
            .count()
    }
}

/// Fetches and classifies `pages` in order against `baseline`
pub async fn probe_pages<F: PageFetcher>(
    fetcher: &F,
    baseline: &Baseline,
    pages: &[BigInt],
) -> ProbeSummary {
    tracing::info!(
        "Probing {} pages against a baseline of {} items",
        pages.len(),
        baseline.item_count()
    );

    let mut local_seen = BTreeSet::new();
    let mut reports = Vec::with_capacity(pages.len());

    for page in pages {
        let result = fetcher.fetch(page).await;

        let report = match result.into_outcome() {
            PageOutcome::Failure(reason) => {
                tracing::warn!("Probe page {} failed: {}", page, reason);
                ProbeReport {
                    page: page.clone(),
                    classification: PageClassification::Failed { reason },
                    item_count: 0,
                    fingerprint: None,
                    new_items: Vec::new(),
                }
            }
            outcome => {
                let items = match outcome {
                    PageOutcome::Success(items) => items,
                    _ => BTreeSet::new(),
                };
                let verdict = baseline.classify(&items, &local_seen);
                local_seen.extend(verdict.new_items.iter().cloned());

                tracing::info!(
                    "Probe page {}: {} ({} items)",
                    page,
                    verdict.classification,
                    items.len()
                );
                ProbeReport {
                    page: page.clone(),
                    classification: verdict.classification,
                    item_count: items.len(),
                    fingerprint: Some(verdict.fingerprint),
                    new_items: verdict.new_items,
                }
            }
        };
        reports.push(report);
    }

    ProbeSummary {
        baseline_items: baseline.item_count(),
        baseline_fingerprints: baseline.fingerprint_count(),
        reports,
        new_items: local_seen,
    }
}

//! Statistics derived from a crawl state
//!
//! This module extracts summary counts from a checkpoint and prints them for
//! the `--stats` command.

use crate::state::CrawlState;
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Number of recorded pages
    pub total_pages: usize,

    /// Count of pages by classification label
    pub pages_by_class: BTreeMap<&'static str, usize>,

    /// Number of unique identifiers seen
    pub unique_items: usize,

    /// Highest page processed
    pub cursor: Option<i64>,

    /// Requests made, retries of failed pages included
    pub total_requests: u64,

    /// Requests that ended in a failure
    pub total_errors: u64,

    /// Pages currently waiting for a retry
    pub failed_pages: Vec<i64>,

    /// Number of pages that exactly repeat an earlier page
    pub true_wraps: usize,

    /// Lowest and highest identifier seen
    pub item_range: Option<(String, String)>,
}

impl CrawlStatistics {
    pub fn from_state(state: &CrawlState) -> Self {
        let mut pages_by_class = BTreeMap::new();
        for record in state.page_records().values() {
            *pages_by_class
                .entry(record.classification.label())
                .or_insert(0) += 1;
        }

        let items = state.seen_items();
        let item_range = match (items.first(), items.last()) {
            (Some(low), Some(high)) => Some((low.to_string(), high.to_string())),
            _ => None,
        };

        Self {
            total_pages: state.page_records().len(),
            pages_by_class,
            unique_items: items.len(),
            cursor: state.cursor(),
            total_requests: state.total_requests(),
            total_errors: state.total_errors(),
            failed_pages: state.failed_pages().iter().copied().collect(),
            true_wraps: state.true_wraps().len(),
            item_range,
        }
    }

    /// Share of recorded pages that were answered successfully, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        let failed = self.pages_by_class.get("failed").copied().unwrap_or(0);
        ((self.total_pages - failed) as f64 / self.total_pages as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages recorded: {}", stats.total_pages);
    match stats.cursor {
        Some(cursor) => println!("  Cursor: {}", cursor),
        None => println!("  Cursor: (none)"),
    }
    println!("  Unique items: {}", stats.unique_items);
    if let Some((low, high)) = &stats.item_range {
        println!("  Item range: {} .. {}", low, high);
    }
    println!("  Requests: {} ({} errors)", stats.total_requests, stats.total_errors);
    println!();

    println!("Pages by Classification:");
    let mut class_counts: Vec<_> = stats.pages_by_class.iter().collect();
    class_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (label, count) in class_counts {
        let percentage = if stats.total_pages > 0 {
            (*count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    if !stats.failed_pages.is_empty() {
        println!("Failed Pages ({}):", stats.failed_pages.len());
        for page in stats.failed_pages.iter().take(20) {
            println!("  - {}", page);
        }
        if stats.failed_pages.len() > 20 {
            println!("  ... and {} more", stats.failed_pages.len() - 20);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} true wraps detected)",
        stats.success_rate(),
        stats.true_wraps
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FailureKind, ItemId, PageOutcome};

    fn items(raw: &[&str]) -> PageOutcome {
        PageOutcome::from_items(raw.iter().map(|r| ItemId::new(r)))
    }

    #[test]
    fn test_statistics_from_state() {
        let mut state = CrawlState::new();
        state.apply(0, items(&["EFTA00000002", "EFTA00000001"])).unwrap();
        state.apply(1, items(&["EFTA00000001", "EFTA00000002"])).unwrap();
        state
            .apply(2, PageOutcome::Failure(FailureKind::Timeout))
            .unwrap();
        state.apply(3, items(&["EFTA00000009"])).unwrap();

        let stats = CrawlStatistics::from_state(&state);
        assert_eq!(stats.total_pages, 4);
        assert_eq!(stats.unique_items, 3);
        assert_eq!(stats.cursor, Some(3));
        assert_eq!(stats.pages_by_class.get("new"), Some(&2));
        assert_eq!(stats.pages_by_class.get("true_wrap"), Some(&1));
        assert_eq!(stats.failed_pages, vec![2]);
        assert_eq!(stats.true_wraps, 1);
        assert_eq!(
            stats.item_range,
            Some(("EFTA00000001".to_string(), "EFTA00000009".to_string()))
        );
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_statistics_of_empty_state() {
        let stats = CrawlStatistics::from_state(&CrawlState::new());
        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.item_range, None);
        assert_eq!(stats.success_rate(), 0.0);
    }
}

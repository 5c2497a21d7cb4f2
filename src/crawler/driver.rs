//! Crawl driver - the sequential, resumable crawl loop
//!
//! This module walks a page range and coordinates:
//! - Loading or creating the crawl state
//! - Fetching each page in increasing order
//! - Classifying and committing every result
//! - Periodic atomic checkpoints (with the manifest alongside)
//! - Retry rounds over failed pages
//! - Cooperative shutdown and final output

use crate::config::Config;
use crate::crawler::fetcher::PageFetcher;
use crate::output::{write_index, IndexMetadata};
use crate::state::{CrawlState, PageClassification};
use crate::storage::{write_manifest, CheckpointStore, OutputLayout};
use crate::{ConfigError, ScanError};
use num_bigint::BigInt;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Tunables for one crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Pages between checkpoints
    pub checkpoint_interval: u32,
    /// Passes over failed pages after the main pass
    pub max_retry_rounds: u32,
    /// Stop after this many consecutive pages without new items
    pub stop_after_without_new: Option<u32>,
    /// Suffix written after every identifier in the manifest
    pub item_extension: String,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            checkpoint_interval: 50,
            max_retry_rounds: 3,
            stop_after_without_new: None,
            item_extension: ".pdf".to_string(),
        }
    }
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            checkpoint_interval: config.crawl.checkpoint_interval,
            max_retry_rounds: config.crawl.max_retry_rounds,
            stop_after_without_new: config.crawl.stop_after_without_new,
            item_extension: config.service.item_extension.clone(),
        }
    }
}

/// How a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    /// The whole range was walked
    Completed,
    /// Too many consecutive pages produced nothing new
    StoppedEarly,
    /// A shutdown was requested
    Interrupted,
}

/// Summary of one `run_crawl` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub status: CrawlStatus,
    pub resumed: bool,
    /// Requests made by this run, retries included
    pub pages_fetched: u64,
    /// Items first seen during this run
    pub new_items: usize,
    pub total_items: usize,
    pub cursor: Option<i64>,
    pub retry_rounds: u32,
    /// Pages still failing after the retry rounds
    pub still_failed: Vec<i64>,
}

/// Walks a page range and keeps the crawl state on disk
pub struct CrawlDriver<F> {
    fetcher: F,
    settings: CrawlSettings,
    layout: OutputLayout,
    checkpoints: CheckpointStore,
    config_hash: Option<String>,
    shutdown: Arc<AtomicBool>,
}

impl<F: PageFetcher> CrawlDriver<F> {
    pub fn new(fetcher: F, settings: CrawlSettings, layout: OutputLayout) -> Self {
        let checkpoints = CheckpointStore::new(layout.checkpoint.clone());
        Self {
            fetcher,
            settings,
            layout,
            checkpoints,
            config_hash: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Records the configuration hash in the pagination index
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Uses an externally owned shutdown flag
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    /// A handle that stops the crawl after the current page when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Crawls `[start, end]`
    ///
    /// With `resume`, an existing checkpoint is restored and the crawl
    /// continues at the page after its cursor; without it the crawl starts
    /// from an empty state. Failed pages are recorded and retried in rounds
    /// after the main pass; they never abort the crawl.
    ///
    /// # Errors
    ///
    /// * A checkpoint that cannot be read or fails validation
    /// * Output files that cannot be written
    pub async fn run_crawl(
        &self,
        start: i64,
        end: i64,
        resume: bool,
    ) -> Result<CrawlReport, ScanError> {
        if end < start {
            return Err(ConfigError::Validation(format!(
                "end page {} is before start page {}",
                end, start
            ))
            .into());
        }
        self.layout.ensure_directory()?;

        let (mut state, resumed) = self.initial_state(resume)?;
        let seen_before = state.seen_items().len();
        let mut pages_fetched = 0u64;
        let mut status = CrawlStatus::Completed;

        let interval = self.settings.checkpoint_interval.max(1);
        let mut since_checkpoint = 0u32;
        let started = std::time::Instant::now();

        let first = state.next_page(start).map(|page| page.max(start));
        match first {
            Some(first) if first <= end => {
                tracing::info!("Crawling pages {} to {}", first, end);
            }
            _ => tracing::info!("Nothing left to crawl in {}..={}", start, end),
        }

        let mut next = first.filter(|page| *page <= end);
        while let Some(page) = next {
            if self.shutdown_requested() {
                tracing::warn!("Shutdown requested, stopping before page {}", page);
                status = CrawlStatus::Interrupted;
                break;
            }

            let result = self.fetcher.fetch(&BigInt::from(page)).await;
            let classification = state.apply(page, result.into_outcome())?;
            pages_fetched += 1;
            since_checkpoint += 1;
            log_classification(page, &classification);

            if since_checkpoint >= interval {
                self.checkpoint(&mut state)?;
                since_checkpoint = 0;
                let rate = pages_fetched as f64 / started.elapsed().as_secs_f64().max(0.001);
                tracing::info!(
                    "Progress: page {}, {} unique items, {} failed pages, {:.2} pages/sec",
                    page,
                    state.seen_items().len(),
                    state.failed_pages().len(),
                    rate
                );
            }

            if let Some(limit) = self.settings.stop_after_without_new {
                if state.consecutive_without_new() >= limit {
                    tracing::info!(
                        "Stopping after {} consecutive pages without new items (page {})",
                        limit,
                        page
                    );
                    status = CrawlStatus::StoppedEarly;
                    break;
                }
            }

            next = page.checked_add(1).filter(|p| *p <= end);
        }

        let mut retry_rounds = 0;
        if status != CrawlStatus::Interrupted {
            let (rounds, fetched, interrupted) = self.retry_failed(&mut state).await?;
            retry_rounds = rounds;
            pages_fetched += fetched;
            if interrupted {
                status = CrawlStatus::Interrupted;
            }
        }

        self.checkpoint(&mut state)?;
        self.write_index(&state, start, end, status)?;

        let still_failed: Vec<i64> = state.failed_pages().iter().copied().collect();
        if !still_failed.is_empty() {
            tracing::warn!(
                "{} pages still failing: {:?}",
                still_failed.len(),
                still_failed
            );
        }

        let report = CrawlReport {
            status,
            resumed,
            pages_fetched,
            new_items: state.seen_items().len() - seen_before,
            total_items: state.seen_items().len(),
            cursor: state.cursor(),
            retry_rounds,
            still_failed,
        };
        tracing::info!(
            "Crawl {:?}: {} requests, {} new items, {} total",
            report.status,
            report.pages_fetched,
            report.new_items,
            report.total_items
        );
        Ok(report)
    }

    /// Restores the checkpoint when resuming, or starts empty
    fn initial_state(&self, resume: bool) -> Result<(CrawlState, bool), ScanError> {
        if !resume {
            tracing::info!("Starting a fresh crawl");
            return Ok((CrawlState::new(), false));
        }

        match self.checkpoints.load()? {
            Some(state) => {
                tracing::info!(
                    "Resuming from checkpoint: cursor {:?}, {} unique items, {} failed pages",
                    state.cursor(),
                    state.seen_items().len(),
                    state.failed_pages().len()
                );
                Ok((state, true))
            }
            None => {
                tracing::info!(
                    "No checkpoint at {}, starting a fresh crawl",
                    self.checkpoints.path().display()
                );
                Ok((CrawlState::new(), false))
            }
        }
    }

    /// Retries failed pages in rounds
    ///
    /// Returns the number of rounds run, the requests made and whether a
    /// shutdown interrupted the rounds.
    async fn retry_failed(&self, state: &mut CrawlState) -> Result<(u32, u64, bool), ScanError> {
        let mut rounds = 0;
        let mut fetched = 0;

        while !state.failed_pages().is_empty() && rounds < self.settings.max_retry_rounds {
            rounds += 1;
            let pending: Vec<i64> = state.failed_pages().iter().copied().collect();
            tracing::info!(
                "Retry round {}/{}: {} failed pages",
                rounds,
                self.settings.max_retry_rounds,
                pending.len()
            );

            let mut recovered = 0;
            for page in pending {
                if self.shutdown_requested() {
                    tracing::warn!("Shutdown requested during retry round {}", rounds);
                    return Ok((rounds, fetched, true));
                }

                let result = self.fetcher.fetch(&BigInt::from(page)).await;
                let classification = state.apply(page, result.into_outcome())?;
                fetched += 1;
                if !classification.is_failed() {
                    recovered += 1;
                    log_classification(page, &classification);
                }
            }

            tracing::info!("Retry round {} recovered {} pages", rounds, recovered);
            self.checkpoint(state)?;
        }

        Ok((rounds, fetched, false))
    }

    /// Persists the state and refreshes the manifest
    fn checkpoint(&self, state: &mut CrawlState) -> Result<(), ScanError> {
        state.touch();
        self.checkpoints.save(state)?;
        write_manifest(
            &self.layout.manifest,
            state.seen_items(),
            &self.settings.item_extension,
        )
        .map_err(|source| ScanError::Output {
            path: self.layout.manifest.clone(),
            source,
        })?;
        tracing::debug!(
            "Checkpoint saved at cursor {:?} ({} items)",
            state.cursor(),
            state.seen_items().len()
        );
        Ok(())
    }

    fn write_index(
        &self,
        state: &CrawlState,
        start: i64,
        end: i64,
        status: CrawlStatus,
    ) -> Result<(), ScanError> {
        let metadata = IndexMetadata::new(state, start, end, status, self.config_hash.clone());
        write_index(&self.layout.index, state, metadata)
    }
}

fn log_classification(page: i64, classification: &PageClassification) {
    match classification {
        PageClassification::New { count } => {
            tracing::info!("Page {}: {} new items", page, count)
        }
        PageClassification::TrueWrap { origin } => {
            tracing::info!("Page {}: exact repeat of page {}", page, origin)
        }
        PageClassification::Failed { reason } => {
            tracing::warn!("Page {}: failed ({})", page, reason)
        }
        other => tracing::debug!("Page {}: {}", page, other),
    }
}

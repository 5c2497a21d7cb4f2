//! Output module for crawl reports
//!
//! This module handles:
//! - The pagination index JSON written at the end of every crawl
//! - Boundary search and probe reports
//! - Crawl statistics for the `--stats` command

mod index;
pub mod stats;

pub use index::{
    write_index, FailedEntry, IndexMetadata, IndexSummary, PaginationIndex, WrapEntry,
};
pub use stats::{print_statistics, CrawlStatistics};

use crate::crawler::{BoundaryReport, ProbeSummary};
use crate::storage::write_json;
use crate::ScanError;
use std::path::Path;

/// Writes a boundary search report as JSON
pub fn write_boundary_report(path: &Path, report: &BoundaryReport) -> Result<(), ScanError> {
    write_json(path, report)?;
    tracing::info!("Wrote boundary report to {}", path.display());
    Ok(())
}

/// Writes probe results as JSON
pub fn write_probe_report(path: &Path, summary: &ProbeSummary) -> Result<(), ScanError> {
    write_json(path, summary)?;
    tracing::info!("Wrote probe results to {}", path.display());
    Ok(())
}

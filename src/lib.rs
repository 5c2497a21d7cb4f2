//! Wrapscan: a resumable paginated-listing crawler
//!
//! This crate walks a page-numbered document listing, classifies every page's
//! identifier set against everything seen so far (new, redundant, exact
//! repeat), locates the page where the listing stops answering, and keeps a
//! checkpoint that lets an interrupted crawl resume without double counting.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for wrapscan operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] storage::CheckpointError),

    #[error("Crawl state error: {0}")]
    State(#[from] state::StateError),

    #[error("Boundary search error: {0}")]
    Locator(#[from] crawler::LocatorError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid identifier pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for wrapscan operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{BoundaryLocator, CrawlDriver, HttpPageFetcher, PageFetcher};
pub use state::{CrawlState, FailureKind, ItemId, PageClassification, PageOutcome, PageResult};

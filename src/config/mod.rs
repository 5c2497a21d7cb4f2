//! Configuration module for wrapscan
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use wrapscan::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("wrapscan.toml")).unwrap();
//! println!("Crawling pages up to {}", config.crawl.end_page);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BoundaryConfig, Config, CrawlConfig, OutputConfig, ServiceConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{parse_probe_ceiling, DEFAULT_PROBE_CEILING};

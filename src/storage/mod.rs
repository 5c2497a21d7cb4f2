//! Storage module for persisting crawl data
//!
//! This module handles everything written to disk:
//! - Atomic checkpoint save/restore of the crawl state
//! - The sorted manifest of unique identifiers
//! - JSON reports (pagination index, boundary search, probe results)
//!
//! Every file is written to a temporary sibling first and renamed into place,
//! so a crash mid-write leaves the previous version intact.

mod checkpoint;
mod manifest;

pub use checkpoint::{CheckpointError, CheckpointStore};
pub use manifest::{read_manifest, render_manifest, write_manifest};

use crate::config::OutputConfig;
use crate::ScanError;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Resolved locations of every file a crawl produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub directory: PathBuf,
    pub checkpoint: PathBuf,
    pub manifest: PathBuf,
    pub index: PathBuf,
    pub boundary: PathBuf,
    pub probe: PathBuf,
}

impl OutputLayout {
    /// Resolves the configured file names inside `directory`
    pub fn new(directory: impl Into<PathBuf>, config: &OutputConfig) -> Self {
        let directory = directory.into();
        Self {
            checkpoint: directory.join(&config.checkpoint_file),
            manifest: directory.join(&config.manifest_file),
            index: directory.join(&config.index_file),
            boundary: directory.join(&config.boundary_file),
            probe: directory.join(&config.probe_file),
            directory,
        }
    }

    /// Resolves the layout from configuration alone
    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.directory, config)
    }

    /// Creates the output directory if needed
    pub fn ensure_directory(&self) -> Result<(), ScanError> {
        fs::create_dir_all(&self.directory).map_err(|source| ScanError::Output {
            path: self.directory.clone(),
            source,
        })
    }
}

/// Writes `bytes` to `path` via a temporary file and a rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp_path = temporary_path(path);
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)
}

/// Serializes `value` as pretty JSON and writes it atomically
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ScanError> {
    let encoded = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &encoded).map_err(|source| ScanError::Output {
        path: path.to_path_buf(),
        source,
    })
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

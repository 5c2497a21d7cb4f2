//! Checkpoint save and restore
//!
//! A checkpoint is the JSON encoding of a [`CrawlState`]. Loading validates
//! every state invariant; a checkpoint that parses but is inconsistent is
//! rejected just like one that does not parse, so a crawl never resumes into a
//! state it cannot trust.

use crate::state::{CrawlState, StateError};
use crate::storage::write_atomic;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or writing a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to access checkpoint {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Checkpoint {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Checkpoint {path} is inconsistent: {source}; repair or delete it")]
    Inconsistent { path: PathBuf, source: StateError },

    #[error("Failed to encode checkpoint: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A checkpoint file on disk
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the checkpoint, if one exists
    ///
    /// # Returns
    ///
    /// * `Ok(Some(state))` - A valid checkpoint was restored
    /// * `Ok(None)` - No checkpoint file exists
    /// * `Err(CheckpointError)` - The file exists but is unreadable or inconsistent
    pub fn load(&self) -> Result<Option<CrawlState>, CheckpointError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CheckpointError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let state: CrawlState =
            serde_json::from_str(&content).map_err(|source| CheckpointError::Parse {
                path: self.path.clone(),
                source,
            })?;

        state
            .validate()
            .map_err(|source| CheckpointError::Inconsistent {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(
            "Loaded checkpoint {} ({} pages, {} unique items)",
            self.path.display(),
            state.page_records().len(),
            state.seen_items().len()
        );

        Ok(Some(state))
    }

    /// Writes the state atomically
    pub fn save(&self, state: &CrawlState) -> Result<(), CheckpointError> {
        let encoded = serde_json::to_vec(state)?;
        write_atomic(&self.path, &encoded).map_err(|source| CheckpointError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Deletes the checkpoint; a missing file is not an error
    pub fn remove(&self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CheckpointError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

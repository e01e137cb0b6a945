//! Session checkpoint persistence.
//!
//! A checkpoint is a small JSON snapshot of the session counters,
//! overwritten in place (last writer wins). It is advisory: losing one
//! costs at most a checkpoint interval of progress reporting, never
//! analyzed records, which live in the Tracking Store.

use crate::error::Result;
use crate::models::{SessionCheckpoint, SessionStats};
use crate::storage;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writer for the session checkpoint file.
#[derive(Debug, Clone)]
pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot the current counters, stamped now.
    pub fn write(&self, stats: &SessionStats, new_series_count: u64) -> Result<()> {
        let checkpoint = SessionCheckpoint {
            stats: stats.clone(),
            timestamp: Utc::now(),
            new_series_count,
        };
        storage::write_json_atomic(&self.path, &checkpoint)?;
        debug!(
            target: "database",
            queries = stats.queries_executed,
            books = stats.books_processed,
            new_series = new_series_count,
            "Checkpoint written"
        );
        Ok(())
    }

    /// The last written checkpoint, if any.
    pub fn read(&self) -> Result<Option<SessionCheckpoint>> {
        storage::read_json(&self.path)
    }
}

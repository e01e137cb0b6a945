//! Atomic JSON persistence for the curated database and checkpoints.
//!
//! Writes go to a temp file with a PID-unique suffix, are fsynced, then
//! renamed over the target. Backup policy lives in the curator, not here.

use crate::error::{Result, StacksError};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::process;
use tracing::debug;

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Read and parse a JSON file.
///
/// Returns `None` if the file doesn't exist; parse failures are errors.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut file = File::open(path).map_err(|e| StacksError::io_with_path(e, path))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| StacksError::io_with_path(e, path))?;

    let data: T = serde_json::from_str(&contents).map_err(|e| StacksError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

/// Write data to a JSON file atomically (temp file, fsync, rename).
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| StacksError::io_with_path(e, parent))?;
        }
    }

    let temp_path = path.with_extension(format!("json.{}.tmp", process::id()));

    let serialized = serde_json::to_string_pretty(data).map_err(|e| StacksError::Json {
        message: format!("Failed to serialize data for {}: {}", path.display(), e),
        source: Some(e),
    })?;

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| StacksError::io_with_path(e, &temp_path))?;

        file.write_all(serialized.as_bytes())
            .map_err(|e| StacksError::io_with_path(e, &temp_path))?;
        file.flush()
            .map_err(|e| StacksError::io_with_path(e, &temp_path))?;

        // fsync so the rename below never exposes a short file
        #[cfg(unix)]
        #[allow(unsafe_code)]
        {
            // SAFETY: fsync on an owned, open fd; no pointers cross the boundary.
            unsafe {
                libc::fsync(file.as_raw_fd());
            }
        }

        #[cfg(not(unix))]
        {
            file.sync_all()
                .map_err(|e| StacksError::io_with_path(e, &temp_path))?;
        }
    }

    fs::rename(&temp_path, path).map_err(|e| StacksError::Io {
        message: format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        ),
        path: Some(path.to_path_buf()),
        source: Some(e),
    })?;

    debug!(target: "database", "Atomically wrote {}", path.display());
    Ok(())
}

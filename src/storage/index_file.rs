//! Reading and writing the capture index backing file.
//!
//! Saves never truncate the live file in place: the serialized index is written
//! to a temporary file in the same directory, synced, and renamed over the
//! previous version. A crash mid-save leaves the old index intact.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use log::{debug, error, info};
use tempfile::NamedTempFile;

use crate::error_handling::types::StorageError;
use crate::storage::types::CaptureIndex;

/// Reads and parses the index at `path`.
///
/// Only I/O failures are reported as [`StorageError::IndexReadFailed`]. Content
/// that is not UTF-8 JSON of the expected shape is reported as
/// [`StorageError::IndexCorrupt`]; it is never replaced by an empty index.
pub fn load_index(path: &Path) -> Result<CaptureIndex, StorageError> {
    let content = fs::read(path).map_err(|e| {
        error!("Failed to read capture index {}: {}", path.display(), e);
        StorageError::IndexReadFailed(format!("{}: {}", path.display(), e))
    })?;
    let index: CaptureIndex = serde_json::from_slice(&content).map_err(|e| {
        error!("Capture index {} could not be parsed: {}", path.display(), e);
        StorageError::IndexCorrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })?;
    debug!("Loaded {} capture record(s) from {}", index.len(), path.display());
    Ok(index)
}

/// Loads the index, creating and persisting an empty one when the file is absent.
pub fn load_or_create_index(path: &Path) -> Result<CaptureIndex, StorageError> {
    match fs::metadata(path) {
        Ok(_) => load_index(path),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No capture index at {}, creating an empty one", path.display());
            let index = CaptureIndex::new();
            save_index(path, &index)?;
            Ok(index)
        }
        Err(e) => {
            error!("Failed to stat capture index {}: {}", path.display(), e);
            Err(StorageError::IndexReadFailed(format!("{}: {}", path.display(), e)))
        }
    }
}

/// Replaces the file at `path` with the serialized `index`.
pub fn save_index(path: &Path, index: &CaptureIndex) -> Result<(), StorageError> {
    let write_failed = |what: &str, e: &dyn std::fmt::Display| {
        error!("Failed to {} capture index {}: {}", what, path.display(), e);
        StorageError::IndexWriteFailed(format!("{}: {}", path.display(), e))
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let json = serde_json::to_vec(index).map_err(|e| write_failed("serialize", &e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_failed("stage", &e))?;
    tmp.write_all(&json).map_err(|e| write_failed("write", &e))?;
    tmp.as_file().sync_all().map_err(|e| write_failed("sync", &e))?;
    tmp.persist(path).map_err(|e| write_failed("replace", &e.error))?;

    debug!("Saved {} capture record(s) to {}", index.len(), path.display());
    Ok(())
}

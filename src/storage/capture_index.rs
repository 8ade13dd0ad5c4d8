//! In-memory capture index with write-through persistence.
//!
//! All appends are serialized by one lock, and a record is only visible to
//! readers after the file on disk reflects it.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::{debug, error, info};

use crate::error_handling::types::StorageError;
use crate::storage::index_file::{load_or_create_index, save_index};
use crate::storage::types::{CaptureIndex, CaptureRecord};

/// Sole owner and writer of the capture index.
///
/// The index is loaded once when the store is opened and kept in memory. Every
/// mutation goes through [`append_and_prune`](Self::append_and_prune), which holds
/// the lock across the whole append → prune → save sequence so concurrent
/// captures can never lose each other's records.
pub struct CaptureIndexStore {
    path: PathBuf,
    index: Mutex<CaptureIndex>,
}

impl CaptureIndexStore {
    /// Loads the index at `path`, creating an empty one if the file is absent.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let index = load_or_create_index(&path)?;
        info!(
            "Capture index opened at {} with {} record(s)",
            path.display(),
            index.len()
        );
        Ok(Self {
            path,
            index: Mutex::new(index),
        })
    }

    /// Copy of the current durable state, in capture order.
    pub fn snapshot(&self) -> Result<CaptureIndex, StorageError> {
        Ok(self.lock()?.clone())
    }

    /// Appends `record`, prunes expired records and saves, as one serialized step.
    ///
    /// The in-memory index is only replaced once the save succeeded; on error
    /// the previous state stays in place.
    pub fn append_and_prune(&self, record: CaptureRecord) -> Result<CaptureIndex, StorageError> {
        self.append_and_prune_at(record, Utc::now())
    }

    pub(crate) fn append_and_prune_at(
        &self,
        record: CaptureRecord,
        now: DateTime<Utc>,
    ) -> Result<CaptureIndex, StorageError> {
        let mut guard = self.lock()?;

        let mut next = guard.clone();
        let artifact_name = record.artifact_name.clone();
        next.append(record);
        let pruned = next.prune(now);
        if pruned > 0 {
            debug!("Pruned {} expired capture record(s)", pruned);
        }

        save_index(&self.path, &next)?;
        *guard = next.clone();
        debug!("Indexed {} ({} record(s) total)", artifact_name, next.len());
        Ok(next)
    }

    fn lock(&self) -> Result<MutexGuard<'_, CaptureIndex>, StorageError> {
        self.index.lock().map_err(|_| {
            error!("Capture index lock poisoned");
            StorageError::IndexWriteFailed("capture index lock poisoned".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::index_file::load_index;
    use chrono::Duration;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record(name: &str, captured_at: DateTime<Utc>) -> CaptureRecord {
        CaptureRecord {
            artifact_name: name.to_string(),
            captured_at,
            overlay: "overlay".to_string(),
            key: "KEY-1".to_string(),
        }
    }

    #[test]
    fn append_and_prune_persists_and_applies_retention() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("captures.json");
        let now = Utc::now();
        let mut seeded = CaptureIndex::new();
        seeded.append(record("old.jpg", now - Duration::days(11)));
        seeded.append(record("recent.jpg", now - Duration::days(1)));
        save_index(&path, &seeded).unwrap();

        let store = CaptureIndexStore::open(&path).unwrap();
        // Loading does not prune.
        assert_eq!(store.snapshot().unwrap().len(), 2);

        let state = store.append_and_prune_at(record("new.jpg", now), now).unwrap();

        let names: Vec<_> = state.items.iter().map(|r| r.artifact_name.clone()).collect();
        assert_eq!(names, vec!["recent.jpg", "new.jpg"]);
        assert_eq!(load_index(&path).unwrap(), state);
        assert_eq!(store.snapshot().unwrap(), state);
    }

    #[test]
    fn failed_save_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("state");
        fs::create_dir(&sub).unwrap();
        let store = CaptureIndexStore::open(sub.join("captures.json")).unwrap();
        fs::remove_dir_all(&sub).unwrap();

        let err = store.append_and_prune(record("x.jpg", Utc::now())).unwrap_err();

        assert!(matches!(err, StorageError::IndexWriteFailed(_)));
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("captures.json");
        let store = Arc::new(CaptureIndexStore::open(&path).unwrap());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .append_and_prune(record(&format!("{}.jpg", i), Utc::now()))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.snapshot().unwrap().len(), 16);
        assert_eq!(load_index(&path).unwrap().len(), 16);
    }

    #[test]
    fn open_surfaces_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("captures.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            CaptureIndexStore::open(&path),
            Err(StorageError::IndexCorrupt { .. })
        ));
    }
}

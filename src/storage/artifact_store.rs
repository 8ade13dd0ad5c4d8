//! Filesystem store for captured images.
//!
//! Artifacts are named after their capture time in epoch milliseconds plus a
//! fixed extension (`1718000000000.jpg`). The store is append-only: nothing in
//! this crate deletes an artifact, even after retention drops its index record.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, error, info, warn};
use regex::Regex;
use tempfile::NamedTempFile;

use crate::error_handling::types::StorageError;

pub const ARTIFACT_EXTENSION: &str = "jpg";

/// Attempts at finding a free name before giving up on a write.
const MAX_NAME_ATTEMPTS: usize = 16;

fn artifact_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]+\.jpg$").expect("static artifact name pattern"))
}

/// A successfully written artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub name: String,
    /// Time encoded in `name`; also used as the record's capture time.
    pub captured_at: DateTime<Utc>,
}

pub struct ArtifactStore {
    dir: PathBuf,
    last_stamp: AtomicI64,
}

impl ArtifactStore {
    /// Opens the store rooted at `dir`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            error!("Failed to create artifact dir {}: {}", dir.display(), e);
            StorageError::ArtifactWriteFailed(format!("{}: {}", dir.display(), e))
        })?;
        info!("ArtifactStore initialized at {}", dir.display());
        Ok(Self {
            dir,
            last_stamp: AtomicI64::new(0),
        })
    }

    /// Durably writes `bytes` under a fresh, unique name.
    ///
    /// The data is staged in a temporary file and moved into place with a
    /// rename that refuses to overwrite, so a failed write never leaves a
    /// resolvable partial artifact and an existing artifact is never replaced.
    pub fn store(&self, bytes: &[u8]) -> Result<StoredArtifact, StorageError> {
        let write_failed = |what: &str, e: &dyn std::fmt::Display| {
            error!("Failed to {} artifact in {}: {}", what, self.dir.display(), e);
            StorageError::ArtifactWriteFailed(format!("{}: {}", self.dir.display(), e))
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| write_failed("stage", &e))?;
        tmp.write_all(bytes).map_err(|e| write_failed("write", &e))?;
        tmp.as_file().sync_all().map_err(|e| write_failed("sync", &e))?;

        let mut stamp = self.next_stamp(Utc::now().timestamp_millis());
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = format!("{}.{}", stamp, ARTIFACT_EXTENSION);
            match tmp.persist_noclobber(self.dir.join(&name)) {
                Ok(_) => {
                    debug!("Stored artifact {} ({} bytes)", name, bytes.len());
                    let captured_at = Utc
                        .timestamp_millis_opt(stamp)
                        .single()
                        .ok_or_else(|| write_failed("timestamp", &stamp))?;
                    return Ok(StoredArtifact { name, captured_at });
                }
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    warn!("Artifact {} already exists, picking the next name", name);
                    tmp = e.file;
                    stamp = self.next_stamp(stamp + 1);
                }
                Err(e) => return Err(write_failed("persist", &e.error)),
            }
        }
        Err(write_failed("name", &"no free artifact name"))
    }

    /// Reads an artifact by name. Only names produced by [`store`](Self::store)
    /// are accepted.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        if !artifact_name_pattern().is_match(name) {
            debug!("Rejected artifact name {:?}", name);
            return Err(StorageError::InvalidArtifactName(name.to_string()));
        }
        let path = self.dir.join(name);
        fs::read(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::ArtifactNotFound(name.to_string())
            } else {
                error!("Read failed {}: {}", path.display(), e);
                StorageError::ArtifactReadFailed(format!("{}: {}", path.display(), e))
            }
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        artifact_name_pattern().is_match(name) && self.dir.join(name).is_file()
    }

    /// Names of all artifacts in the store, sorted.
    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            error!("Failed to read artifact dir {}: {}", self.dir.display(), e);
            StorageError::ArtifactReadFailed(format!("{}: {}", self.dir.display(), e))
        })?;
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| artifact_name_pattern().is_match(name))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Hands out strictly increasing millisecond stamps, at least `wanted`.
    fn next_stamp(&self, wanted: i64) -> i64 {
        let mut last = self.last_stamp.load(Ordering::Acquire);
        loop {
            let next = wanted.max(last + 1);
            match self.last_stamp.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }
}

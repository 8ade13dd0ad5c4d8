//! Storage subsystem
//!
//! Persists captured images and the capture index that lists them.
//!
//! Components:
//! - `types`: `CaptureRecord`, `CaptureIndex` and the retention rule.
//! - `index_file`: atomic load/save of the index backing file.
//! - `capture_index`: `CaptureIndexStore`, the serialized owner of the index.
//! - `artifact_store`: append-only image directory with unique naming.

pub mod artifact_store;
pub mod capture_index;
pub mod index_file;
pub mod types;

pub use artifact_store::{ArtifactStore, StoredArtifact};
pub use capture_index::CaptureIndexStore;
pub use types::{CaptureIndex, CaptureRecord, RETENTION_DAYS};

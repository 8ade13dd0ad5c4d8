//! Capture intake orchestration.
//!
//! A trigger goes through validate → capture → store artifact → index. The
//! work is split in two phases so the HTTP layer can choose when to answer:
//!
//! - [`IntakeCoordinator::acquire`] validates the payload and waits for the
//!   device to produce an image (bounded by the capture timeout).
//! - [`IntakeCoordinator::persist`] writes the artifact and then appends its
//!   record to the index.
//!
//! [`IntakeCoordinator::handle_trigger`] runs both and reports an [`Outcome`].
//!
//! Failure windows
//! - Device or artifact failures leave the index untouched.
//! - An index failure after the artifact was written leaves an orphaned
//!   artifact. It is logged at ERROR with its file name and is not cleaned up.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use uuid::Uuid;

use super::types::{Outcome, Trigger, TriggerPayload};
use crate::capture_device::CaptureDevice;
use crate::error_handling::types::{DeviceError, IntakeError, StorageError};
use crate::storage::artifact_store::ArtifactStore;
use crate::storage::capture_index::CaptureIndexStore;
use crate::storage::types::CaptureRecord;

/// Image bytes returned by the device, waiting to be persisted.
#[derive(Debug)]
pub struct AcquiredCapture {
    pub trace_id: Uuid,
    pub trigger: Trigger,
    pub image: Vec<u8>,
}

pub struct IntakeCoordinator {
    device: Arc<dyn CaptureDevice>,
    artifacts: Arc<ArtifactStore>,
    index: Arc<CaptureIndexStore>,
    capture_timeout: Duration,
}

impl IntakeCoordinator {
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        artifacts: Arc<ArtifactStore>,
        index: Arc<CaptureIndexStore>,
        capture_timeout: Duration,
    ) -> Self {
        Self {
            device,
            artifacts,
            index,
            capture_timeout,
        }
    }

    pub fn index(&self) -> &Arc<CaptureIndexStore> {
        &self.index
    }

    pub fn artifacts(&self) -> &Arc<ArtifactStore> {
        &self.artifacts
    }

    /// Validates `payload` and captures one image.
    ///
    /// An invalid payload is rejected before the device is touched.
    pub async fn acquire(&self, payload: TriggerPayload) -> Result<AcquiredCapture, IntakeError> {
        let trace_id = Uuid::new_v4();
        let trigger = payload.validate().map_err(|e| {
            warn!("[{}] Rejected trigger: {}", trace_id, e);
            e
        })?;
        debug!(
            "[{}] Trigger {} accepted, capturing with {}",
            trace_id,
            trigger.key,
            self.device.describe()
        );

        let image = match tokio::time::timeout(self.capture_timeout, self.device.begin_capture())
            .await
        {
            Ok(Ok(image)) => image,
            Ok(Err(e)) => {
                error!("[{}] Capturing picture failed: {}", trace_id, e);
                return Err(IntakeError::CaptureDevice(e));
            }
            Err(_) => {
                error!(
                    "[{}] Capture timed out after {:?}",
                    trace_id, self.capture_timeout
                );
                return Err(IntakeError::CaptureDevice(DeviceError::Timeout(
                    self.capture_timeout,
                )));
            }
        };
        info!("[{}] Captured image ({} bytes)", trace_id, image.len());

        Ok(AcquiredCapture {
            trace_id,
            trigger,
            image,
        })
    }

    /// Stores the artifact, then records it in the index.
    pub async fn persist(&self, capture: AcquiredCapture) -> Result<CaptureRecord, IntakeError> {
        let AcquiredCapture {
            trace_id,
            trigger,
            image,
        } = capture;

        let artifacts = Arc::clone(&self.artifacts);
        let stored = tokio::task::spawn_blocking(move || artifacts.store(&image))
            .await
            .map_err(|e| StorageError::ArtifactWriteFailed(format!("writer task failed: {}", e)))
            .and_then(|r| r)
            .map_err(|e| {
                error!("[{}] Could not store image: {}", trace_id, e);
                IntakeError::ArtifactWrite(e)
            })?;
        info!("[{}] Wrote artifact {}", trace_id, stored.name);

        let record = CaptureRecord {
            artifact_name: stored.name.clone(),
            captured_at: stored.captured_at,
            overlay: trigger.description,
            key: trigger.key,
        };

        let index = Arc::clone(&self.index);
        let to_append = record.clone();
        tokio::task::spawn_blocking(move || index.append_and_prune(to_append))
            .await
            .map_err(|e| StorageError::IndexWriteFailed(format!("index task failed: {}", e)))
            .and_then(|r| r)
            .map_err(|e| {
                error!(
                    "[{}] Artifact {} is orphaned, index update failed: {}",
                    trace_id, stored.name, e
                );
                IntakeError::IndexWrite {
                    artifact_name: stored.name.clone(),
                    source: e,
                }
            })?;

        info!(
            "[{}] Recorded capture {} for {}",
            trace_id, record.artifact_name, record.key
        );
        Ok(record)
    }

    /// Runs a trigger to completion.
    pub async fn handle_trigger(&self, payload: TriggerPayload) -> Outcome {
        let acquired = match self.acquire(payload).await {
            Ok(acquired) => acquired,
            Err(e @ IntakeError::InvalidPayload(_)) => return Outcome::Rejected(e),
            Err(e) => return Outcome::Failed(e),
        };
        match self.persist(acquired).await {
            Ok(record) => Outcome::Accepted(record),
            Err(e) => Outcome::Failed(e),
        }
    }

    /// Artifacts on disk that no index record references.
    ///
    /// Includes both orphans from failed index updates and images whose
    /// records aged out of the index. Only reported, never acted upon.
    pub fn unindexed_artifacts(&self) -> Result<Vec<String>, StorageError> {
        let snapshot = self.index.snapshot()?;
        let indexed: HashSet<&str> = snapshot
            .items
            .iter()
            .map(|r| r.artifact_name.as_str())
            .collect();
        Ok(self
            .artifacts
            .list()?
            .into_iter()
            .filter(|name| !indexed.contains(name.as_str()))
            .collect())
    }
}

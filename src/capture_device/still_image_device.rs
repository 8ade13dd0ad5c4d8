use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;

use super::device_trait::CaptureDevice;
use crate::error_handling::types::DeviceError;

/// Serves the same image file for every capture.
///
/// Useful on machines without a camera; the file is re-read on every capture
/// so it can be swapped while the service runs.
#[derive(Debug, Clone)]
pub struct StillImageDevice {
    path: PathBuf,
}

impl StillImageDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CaptureDevice for StillImageDevice {
    async fn begin_capture(&self) -> Result<Vec<u8>, DeviceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| DeviceError::CaptureFailed(format!("{}: {}", self.path.display(), e)))?;
        if bytes.is_empty() {
            return Err(DeviceError::EmptyFrame);
        }
        debug!("Read {} bytes from {}", bytes.len(), self.path.display());
        Ok(bytes)
    }

    fn describe(&self) -> String {
        format!("still image {}", self.path.display())
    }
}

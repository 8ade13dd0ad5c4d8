//! Capture Device trait
//!
//! A `CaptureDevice` wraps whatever produces the image: a camera grabbed
//! through an external program, a fixed still image, or a test double.
//!
//! Each call to [`CaptureDevice::begin_capture`] is one independent capture
//! attempt. Implementations keep no state between calls and do not serialize
//! overlapping calls; they do not retry either, failures are returned as-is.

use async_trait::async_trait;

use crate::error_handling::types::DeviceError;

#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Starts one capture and resolves with the raw image bytes.
    async fn begin_capture(&self) -> Result<Vec<u8>, DeviceError>;

    /// Human readable description used in logs.
    fn describe(&self) -> String;
}

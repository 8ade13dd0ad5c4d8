//! Capture device adapters.
//!
//! - `device_trait`: the `CaptureDevice` trait the intake coordinator drives.
//! - `command_device`: grabs a frame through an external program.
//! - `still_image_device`: serves a fixed image file.

pub mod command_device;
pub mod device_trait;
pub mod still_image_device;

use std::sync::Arc;

use log::info;

pub use command_device::CommandDevice;
pub use device_trait::CaptureDevice;
pub use still_image_device::StillImageDevice;

use crate::configuration::types::{DeviceConfig, DeviceKind};
use crate::error_handling::types::ConfigError;

/// Instantiates the device described by `config`.
pub fn from_config(config: &DeviceConfig) -> Result<Arc<dyn CaptureDevice>, ConfigError> {
    let device: Arc<dyn CaptureDevice> = match config.kind {
        DeviceKind::Command => Arc::new(
            CommandDevice::from_command_line(&config.command)
                .ok_or_else(|| ConfigError::InvalidDevice("device.command is empty".into()))?,
        ),
        DeviceKind::StillImage => {
            let path = config.image_path.clone().ok_or_else(|| {
                ConfigError::InvalidDevice("device.image_path is required for still_image".into())
            })?;
            Arc::new(StillImageDevice::new(path))
        }
    };
    info!("Capture device: {}", device.describe());
    Ok(device)
}

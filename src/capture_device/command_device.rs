use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, trace, warn};
use tokio::process::Command;

use super::device_trait::CaptureDevice;
use crate::error_handling::types::DeviceError;

/// Grabs a frame by running an external program that writes the image to stdout.
///
/// The default configuration uses `ffmpeg` to pull a single frame from a V4L2
/// camera, but any program following the same contract works (`fswebcam -`,
/// `libcamera-still -o -`, ...). The child is killed if the capture is abandoned.
#[derive(Debug, Clone)]
pub struct CommandDevice {
    program: String,
    args: Vec<String>,
}

impl CommandDevice {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Builds a device from a full command line, program first.
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl CaptureDevice for CommandDevice {
    async fn begin_capture(&self) -> Result<Vec<u8>, DeviceError> {
        debug!("Running capture command {}", self.describe());
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DeviceError::Unavailable(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                "Capture command {} exited with {}: {}",
                self.program, output.status, stderr
            );
            let reason = if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(DeviceError::CaptureFailed(reason));
        }
        if output.stdout.is_empty() {
            return Err(DeviceError::EmptyFrame);
        }
        trace!("Capture command produced {} bytes", output.stdout.len());
        Ok(output.stdout)
    }

    fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandDevice {
        CommandDevice::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn stdout_becomes_the_image() {
        let bytes = sh("printf 'JFIF'").begin_capture().await.unwrap();
        assert_eq!(bytes, b"JFIF");
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_capture_failure() {
        let err = sh("echo 'no camera' >&2; exit 3").begin_capture().await.unwrap_err();
        match err {
            DeviceError::CaptureFailed(reason) => assert_eq!(reason, "no camera"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_output_is_rejected() {
        let err = sh("true").begin_capture().await.unwrap_err();
        assert!(matches!(err, DeviceError::EmptyFrame));
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let device = CommandDevice::new("/nonexistent/shipcam-grabber", vec![]);
        let err = device.begin_capture().await.unwrap_err();
        assert!(matches!(err, DeviceError::Unavailable(_)));
    }

    #[test]
    fn command_line_parsing() {
        let cmd = vec!["fswebcam".to_string(), "-".to_string()];
        let device = CommandDevice::from_command_line(&cmd).unwrap();
        assert_eq!(device.describe(), "fswebcam -");
        assert!(CommandDevice::from_command_line(&[]).is_none());
        assert!(CommandDevice::from_command_line(&[" ".to_string()]).is_none());
    }
}

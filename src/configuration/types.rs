use std::path::PathBuf;

use serde::Deserialize;

/// When the webhook caller gets its answer.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    /// Answer as soon as the device produced an image; storage continues in
    /// the background and its failures are only logged.
    #[default]
    Accepted,
    /// Answer once the artifact and its index record are durably written.
    Durable,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    #[default]
    Command,
    StillImage,
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub kind: DeviceKind,
    /// Program and arguments, for `kind = "command"`.
    pub command: Vec<String>,
    /// Image served on every capture, for `kind = "still_image"`.
    pub image_path: Option<PathBuf>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            kind: DeviceKind::Command,
            command: [
                "ffmpeg",
                "-loglevel",
                "error",
                "-f",
                "v4l2",
                "-i",
                "/dev/video0",
                "-frames:v",
                "1",
                "-f",
                "image2",
                "-",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            image_path: None,
        }
    }
}

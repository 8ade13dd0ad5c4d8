pub mod config;
pub mod types;

pub use config::{Args, Config};
pub use types::{AckMode, DeviceConfig, DeviceKind};

use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use log::{debug, error, info};
use serde::Deserialize;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command-line arguments.
///
/// Every flag is optional: values given here override the ones read from the
/// configuration file, which themselves override the built-in defaults.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use shipcam::configuration::config::{Args, Config};
///
/// let args = Args::parse();
/// let config = Config::load(&args).expect("valid configuration");
/// println!("Listening on {}:{}", config.bind_address, config.port);
/// ```
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "shipcam")]
#[command(version)]
#[command(about = "Webhook-triggered camera capture gallery")]
pub struct Args {
    /// Path to a TOML configuration file
    ///
    /// # Command Line
    /// Use `--config <FILE>` or `-c <FILE>`
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Network address to bind the HTTP server to
    ///
    /// # Command Line
    /// Use `--bind-address <ADDRESS>` or the `SHIPCAM_BIND_ADDRESS` variable
    #[arg(long, env = "SHIPCAM_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Port of the HTTP server
    #[arg(long, env = "SHIPCAM_PORT")]
    pub port: Option<u16>,

    /// Directory holding the capture index and the captures directory
    ///
    /// The directory must exist; the index and artifact directory inside it are
    /// created on first start.
    ///
    /// # Command Line
    /// Use `--storage-path <PATH>` or the `SHIPCAM_STORAGE_PATH` variable
    #[arg(long, env = "SHIPCAM_STORAGE_PATH")]
    pub storage_path: Option<PathBuf>,

    /// Seconds to wait for the capture device before giving up
    #[arg(long)]
    pub capture_timeout_secs: Option<u64>,

    /// Capture program followed by its arguments, one value each
    ///
    /// # Command Line
    /// Use `--device-command fswebcam --no-banner "/dev/video 1" -`. The flag
    /// takes every remaining value, including ones starting with `-`, so it
    /// must come last.
    #[arg(long, num_args = 1.., allow_hyphen_values = true, value_name = "ARG")]
    pub device_command: Option<Vec<String>>,

    /// Serve this image file instead of using a camera
    #[arg(long, conflicts_with = "device_command")]
    pub still_image: Option<PathBuf>,

    /// Only answer webhooks once the capture is durably recorded
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub synchronous_ack: bool,
}

/// Application configuration.
///
/// # Fields Overview
///
/// - `bind_address` / `port`: HTTP listener
/// - `storage_path`: root directory for persisted state
/// - `captures_dir`: artifact directory name, relative to `storage_path`
/// - `index_file`: capture index file name, relative to `storage_path`
/// - `capture_timeout_secs`: upper bound on a single capture
/// - `ack`: when the webhook caller is answered, see [`AckMode`]
/// - `device`: which capture device to use
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    pub storage_path: PathBuf,
    pub captures_dir: String,
    pub index_file: String,
    pub capture_timeout_secs: u64,
    pub ack: AckMode,
    pub device: DeviceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0"),
            port: 8082,
            storage_path: PathBuf::from("."),
            captures_dir: String::from("captures"),
            index_file: String::from("captures.json"),
            capture_timeout_secs: 30,
            ack: AckMode::Accepted,
            device: DeviceConfig::default(),
        }
    }
}

impl Config {
    /// Reads a TOML file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            error!("Unable to read configuration file {}: {}", path.display(), e);
            ConfigError::IoError(e)
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))
    }

    /// Builds the configuration from defaults, the optional file named in
    /// `args`, then the command-line overrides, and validates the result.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => {
                info!("Importing configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_args(args);
        config.validate()?;
        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(addr) = &args.bind_address {
            self.bind_address = addr.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(path) = &args.storage_path {
            self.storage_path = path.clone();
        }
        if let Some(secs) = args.capture_timeout_secs {
            self.capture_timeout_secs = secs;
        }
        if let Some(cmd) = &args.device_command {
            self.device.kind = DeviceKind::Command;
            self.device.command = cmd.clone();
        }
        if let Some(image) = &args.still_image {
            self.device.kind = DeviceKind::StillImage;
            self.device.image_path = Some(image.clone());
        }
        if args.synchronous_ack {
            self.ack = AckMode::Durable;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_address
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::BadIPFormatting(format!("{}: {}", self.bind_address, e)))?;

        if !self.storage_path.is_dir() {
            return Err(ConfigError::DirectoryDoesNotExist(
                self.storage_path.display().to_string(),
            ));
        }
        if self.capture_timeout_secs == 0 {
            return Err(ConfigError::NotInRange(
                "capture_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.captures_dir.trim().is_empty() || self.index_file.trim().is_empty() {
            return Err(ConfigError::NotInRange(
                "captures_dir and index_file must not be empty".to_string(),
            ));
        }

        match self.device.kind {
            DeviceKind::Command => {
                if self.device.command.first().map_or(true, |p| p.trim().is_empty()) {
                    return Err(ConfigError::InvalidDevice(
                        "device.command is empty".to_string(),
                    ));
                }
            }
            DeviceKind::StillImage => match &self.device.image_path {
                Some(p) if p.is_file() => {}
                Some(p) => {
                    return Err(ConfigError::InvalidDevice(format!(
                        "still image {} does not exist",
                        p.display()
                    )))
                }
                None => {
                    return Err(ConfigError::InvalidDevice(
                        "device.image_path is required for still_image".to_string(),
                    ))
                }
            },
        }
        Ok(())
    }

    pub fn captures_path(&self) -> PathBuf {
        self.storage_path.join(&self.captures_dir)
    }

    pub fn index_path(&self) -> PathBuf {
        self.storage_path.join(&self.index_file)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn args_under_test(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec!["shipcam"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    #[test]
    fn defaults_match_historical_layout() {
        let config = Config::default();
        assert_eq!(config.port, 8082);
        assert_eq!(config.index_path(), PathBuf::from("./captures.json"));
        assert_eq!(config.captures_path(), PathBuf::from("./captures"));
        assert_eq!(config.ack, AckMode::Accepted);
        assert_eq!(config.device.kind, DeviceKind::Command);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let config = Config::from_toml_str(
            r#"
            port = 9000
            ack = "durable"
            capture_timeout_secs = 5

            [device]
            kind = "still_image"
            image_path = "/tmp/still.jpg"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.ack, AckMode::Durable);
        assert_eq!(config.capture_timeout(), Duration::from_secs(5));
        assert_eq!(config.device.kind, DeviceKind::StillImage);
        assert_eq!(config.device.image_path, Some(PathBuf::from("/tmp/still.jpg")));
        assert_eq!(config.bind_address, "0.0.0.0");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            Config::from_toml_str("port = \"eighty\""),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    #[serial]
    fn args_override_file_values() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("shipcam.toml");
        fs::write(&file, "port = 9000\nbind_address = \"127.0.0.1\"\n").unwrap();
        let storage = dir.path().to_str().unwrap();

        let args = args_under_test(&[
            "--config",
            file.to_str().unwrap(),
            "--port",
            "9100",
            "--storage-path",
            storage,
            "--synchronous-ack",
            "--device-command",
            "fswebcam",
            "--no-banner",
            "-",
        ])
        .unwrap();
        let config = Config::load(&args).unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.storage_path, dir.path());
        assert_eq!(config.device.command, vec!["fswebcam", "--no-banner", "-"]);
        assert_eq!(config.ack, AckMode::Durable);
    }

    #[test]
    #[serial]
    fn storage_path_can_come_from_environment() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("SHIPCAM_STORAGE_PATH", dir.path());
        let args = args_under_test(&[]);
        std::env::remove_var("SHIPCAM_STORAGE_PATH");

        let config = Config::load(&args.unwrap()).unwrap();
        assert_eq!(config.storage_path, dir.path());
    }

    #[test]
    fn device_command_keeps_arguments_with_spaces() {
        let args = args_under_test(&[
            "--device-command",
            "ffmpeg",
            "-i",
            "/dev/video camera",
            "-",
        ])
        .unwrap();
        let mut config = Config::default();
        config.apply_args(&args);

        assert_eq!(config.device.kind, DeviceKind::Command);
        assert_eq!(
            config.device.command,
            vec!["ffmpeg", "-i", "/dev/video camera", "-"]
        );
    }

    #[test]
    fn still_image_conflicts_with_device_command() {
        assert!(args_under_test(&["--still-image", "a.jpg", "--device-command", "x"]).is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let dir = TempDir::new().unwrap();
        let valid = Config {
            storage_path: dir.path().to_path_buf(),
            ..Config::default()
        };
        assert!(valid.validate().is_ok());

        let bad_ip = Config {
            bind_address: "localhost:80".into(),
            ..valid.clone()
        };
        assert!(matches!(bad_ip.validate(), Err(ConfigError::BadIPFormatting(_))));

        let missing_dir = Config {
            storage_path: dir.path().join("nope"),
            ..valid.clone()
        };
        assert!(matches!(
            missing_dir.validate(),
            Err(ConfigError::DirectoryDoesNotExist(_))
        ));

        let zero_timeout = Config {
            capture_timeout_secs: 0,
            ..valid.clone()
        };
        assert!(matches!(zero_timeout.validate(), Err(ConfigError::NotInRange(_))));

        let mut no_command = valid.clone();
        no_command.device.command.clear();
        assert!(matches!(no_command.validate(), Err(ConfigError::InvalidDevice(_))));

        let mut missing_image = valid;
        missing_image.device.kind = DeviceKind::StillImage;
        missing_image.device.image_path = Some(dir.path().join("missing.jpg"));
        assert!(matches!(
            missing_image.validate(),
            Err(ConfigError::InvalidDevice(_))
        ));
    }
}

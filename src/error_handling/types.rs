use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadIPFormatting(String),
    DirectoryDoesNotExist(String),
    NotInRange(String),
    InvalidDevice(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadIPFormatting(e) => write!(f, "IP formatting error: {}", e),
            ConfigError::DirectoryDoesNotExist(e) => write!(f, "Directory error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::InvalidDevice(e) => write!(f, "Capture device configuration error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Failure reported by a capture device. Propagated verbatim, never retried.
#[derive(Debug)]
pub enum DeviceError {
    Unavailable(String),
    CaptureFailed(String),
    EmptyFrame,
    Timeout(Duration),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Unavailable(e) => write!(f, "Capture device unavailable: {}", e),
            DeviceError::CaptureFailed(e) => write!(f, "Capture failed: {}", e),
            DeviceError::EmptyFrame => write!(f, "Capture device returned an empty image"),
            DeviceError::Timeout(d) => {
                write!(f, "Capture did not complete within {}s", d.as_secs())
            }
        }
    }
}

impl std::error::Error for DeviceError {}

#[derive(Debug)]
pub enum StorageError {
    ArtifactWriteFailed(String),
    ArtifactNotFound(String),
    ArtifactReadFailed(String),
    InvalidArtifactName(String),
    IndexReadFailed(String),
    IndexCorrupt { path: String, reason: String },
    IndexWriteFailed(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ArtifactWriteFailed(e) => write!(f, "Artifact write failed: {}", e),
            StorageError::ArtifactNotFound(name) => write!(f, "Artifact not found: {}", name),
            StorageError::ArtifactReadFailed(e) => write!(f, "Artifact read failed: {}", e),
            StorageError::InvalidArtifactName(name) => {
                write!(f, "Invalid artifact name: {:?}", name)
            }
            StorageError::IndexReadFailed(e) => write!(f, "Capture index read failed: {}", e),
            StorageError::IndexCorrupt { path, reason } => {
                write!(f, "Capture index {} is corrupt: {}", path, reason)
            }
            StorageError::IndexWriteFailed(e) => write!(f, "Capture index write failed: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

/// Terminal failure of a single trigger.
#[derive(Debug)]
pub enum IntakeError {
    InvalidPayload(String),
    CaptureDevice(DeviceError),
    ArtifactWrite(StorageError),
    /// The artifact was stored but no index record references it.
    IndexWrite {
        artifact_name: String,
        source: StorageError,
    },
}

impl fmt::Display for IntakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntakeError::InvalidPayload(e) => write!(f, "Invalid payload: {}", e),
            IntakeError::CaptureDevice(e) => write!(f, "Capture device error: {}", e),
            IntakeError::ArtifactWrite(e) => write!(f, "Artifact write error: {}", e),
            IntakeError::IndexWrite {
                artifact_name,
                source,
            } => write!(
                f,
                "Index write error ({} is now orphaned): {}",
                artifact_name, source
            ),
        }
    }
}

impl std::error::Error for IntakeError {}

#[derive(Debug)]
pub enum WebError {
    BadBindAddress(String),
    TemplateMissing(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BadBindAddress(e) => write!(f, "Bad bind address: {}", e),
            WebError::TemplateMissing(e) => write!(f, "Embedded template missing: {}", e),
        }
    }
}

impl std::error::Error for WebError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    StorageError(StorageError),
    WebError(WebError),
    InitializationFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::StorageError(e) => write!(f, "Storage error: {}", e),
            ControllerError::WebError(e) => write!(f, "Web error: {}", e),
            ControllerError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<StorageError> for ControllerError {
    fn from(err: StorageError) -> Self {
        ControllerError::StorageError(err)
    }
}

impl From<WebError> for ControllerError {
    fn from(err: WebError) -> Self {
        ControllerError::WebError(err)
    }
}

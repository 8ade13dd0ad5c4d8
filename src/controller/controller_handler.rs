use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use log::{error, info, warn};

use crate::capture_device;
use crate::configuration::config::Config;
use crate::error_handling::types::*;
use crate::intake::IntakeCoordinator;
use crate::storage::artifact_store::ArtifactStore;
use crate::storage::capture_index::CaptureIndexStore;
use crate::web_interface::WebServer;

/// Wires configuration, storage, the capture device and the web server together.
pub struct Controller {
    pub config: Config,
    coordinator: Arc<IntakeCoordinator>,
}

impl Controller {
    /// Opens the artifact directory and the capture index and builds the
    /// configured capture device.
    ///
    /// A corrupt index aborts startup with [`StorageError::IndexCorrupt`]
    /// instead of being replaced.
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing storage under {}", config.storage_path.display());
        fs::create_dir_all(&config.storage_path).map_err(|e| {
            error!(
                "Unable to create storage path {}: {}",
                config.storage_path.display(),
                e
            );
            ControllerError::InitializationFailed(e.to_string())
        })?;

        let artifacts = Arc::new(ArtifactStore::new(config.captures_path())?);
        let index = Arc::new(CaptureIndexStore::open(config.index_path()).map_err(|e| {
            error!("Unable to open the capture index: {}", e);
            e
        })?);
        let device = capture_device::from_config(&config.device)?;

        let coordinator = Arc::new(IntakeCoordinator::new(
            device,
            artifacts,
            index,
            config.capture_timeout(),
        ));

        match coordinator.unindexed_artifacts() {
            Ok(names) if !names.is_empty() => info!(
                "{} artifact(s) in {} are not referenced by the index",
                names.len(),
                config.captures_path().display()
            ),
            Ok(_) => {}
            Err(e) => warn!("Could not compare artifacts against the index: {}", e),
        }

        Ok(Self {
            config,
            coordinator,
        })
    }

    pub fn coordinator(&self) -> &Arc<IntakeCoordinator> {
        &self.coordinator
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ControllerError> {
        let ip: IpAddr = self.config.bind_address.parse().map_err(|e| {
            WebError::BadBindAddress(format!("{}: {}", self.config.bind_address, e))
        })?;
        Ok(SocketAddr::new(ip, self.config.port))
    }

    /// Serves HTTP until the process is stopped.
    pub async fn run(&self) -> Result<(), ControllerError> {
        let addr = self.socket_addr()?;
        let server = WebServer::new(Arc::clone(&self.coordinator), self.config.ack);
        server.start(addr).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::types::{DeviceConfig, DeviceKind};
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let still = dir.path().join("still.jpg");
        fs::write(&still, b"img").unwrap();
        Config {
            bind_address: "127.0.0.1".into(),
            port: 0,
            storage_path: dir.path().to_path_buf(),
            device: DeviceConfig {
                kind: DeviceKind::StillImage,
                command: vec![],
                image_path: Some(still),
            },
            ..Config::default()
        }
    }

    #[test]
    fn new_creates_storage_layout() {
        let dir = TempDir::new().unwrap();
        let controller = Controller::new(config_in(&dir)).unwrap();

        assert!(dir.path().join("captures").is_dir());
        assert_eq!(
            fs::read_to_string(dir.path().join("captures.json")).unwrap(),
            r#"{"items":[]}"#
        );
        assert_eq!(
            controller.socket_addr().unwrap(),
            "127.0.0.1:0".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn corrupt_index_aborts_startup() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("captures.json"), "garbage").unwrap();

        let err = Controller::new(config_in(&dir)).err().unwrap();

        assert!(matches!(
            err,
            ControllerError::StorageError(StorageError::IndexCorrupt { .. })
        ));
        assert_eq!(
            fs::read_to_string(dir.path().join("captures.json")).unwrap(),
            "garbage"
        );
    }

    #[tokio::test]
    async fn controller_handles_a_trigger_end_to_end() {
        let dir = TempDir::new().unwrap();
        let controller = Controller::new(config_in(&dir)).unwrap();

        let outcome = controller
            .coordinator()
            .handle_trigger(crate::intake::TriggerPayload::new("ABC-1", "Shipped!"))
            .await;

        assert!(outcome.is_accepted());
        assert_eq!(controller.coordinator().index().snapshot().unwrap().len(), 1);
    }
}

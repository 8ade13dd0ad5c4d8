use std::net::SocketAddr;
use std::sync::Arc;

use log::info;
use warp::{Filter, Rejection, Reply};

use super::routes::{artifact_route, gallery_route, trigger_route};
use crate::configuration::types::AckMode;
use crate::intake::IntakeCoordinator;

/// HTTP front end: the gallery, the stored images and the webhook.
pub struct WebServer {
    coordinator: Arc<IntakeCoordinator>,
    ack: AckMode,
}

impl WebServer {
    pub fn new(coordinator: Arc<IntakeCoordinator>, ack: AckMode) -> Self {
        Self { coordinator, ack }
    }

    /// All routes, composed.
    pub fn routes(&self) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
        gallery_route(Arc::clone(self.coordinator.index()))
            .or(artifact_route(Arc::clone(self.coordinator.artifacts())))
            .or(trigger_route(Arc::clone(&self.coordinator), self.ack))
    }

    /// Serves until the process exits.
    pub async fn start(&self, addr: SocketAddr) {
        info!("Server running at {} (ack mode: {:?})", addr, self.ack);
        warp::serve(self.routes()).run(addr).await;
    }
}

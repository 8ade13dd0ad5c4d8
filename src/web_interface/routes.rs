use std::sync::Arc;

use bytes::Bytes;
use log::{debug, error, info};
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use super::gallery::render_gallery;
use crate::configuration::types::AckMode;
use crate::error_handling::types::{IntakeError, StorageError};
use crate::intake::{IntakeCoordinator, TriggerPayload};
use crate::storage::artifact_store::ArtifactStore;
use crate::storage::capture_index::CaptureIndexStore;

/// Webhook bodies up to this size are accepted; larger ones are answered
/// `500 Invalid Payload`.
const MAX_TRIGGER_BODY: u64 = 100 * 1024;

fn text(status: StatusCode, body: &'static str) -> reply::Response {
    reply::with_status(body, status).into_response()
}

/// GET /
pub fn gallery_route(
    index: Arc<CaptureIndexStore>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path::end().and(warp::get()).and_then(move || {
        let index = index.clone();
        async move {
            let res = match index.snapshot().map_err(|e| e.to_string()).and_then(|snapshot| {
                render_gallery(&snapshot.items).map_err(|e| e.to_string())
            }) {
                Ok(html) => reply::html(html).into_response(),
                Err(e) => {
                    error!("Failed to render gallery: {}", e);
                    text(StatusCode::INTERNAL_SERVER_ERROR, "Could not render gallery")
                }
            };
            Ok::<_, Rejection>(res)
        }
    })
}

/// GET /captures/:name
pub fn artifact_route(
    artifacts: Arc<ArtifactStore>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("captures" / String)
        .and(warp::get())
        .and_then(move |name: String| {
            let artifacts = artifacts.clone();
            async move {
                let lookup = name.clone();
                let read = tokio::task::spawn_blocking(move || artifacts.read(&lookup)).await;
                let res = match read {
                    Ok(Ok(bytes)) => {
                        let mime = mime_guess::from_path(&name).first_or_octet_stream();
                        reply::with_header(bytes, "Content-Type", mime.to_string()).into_response()
                    }
                    Ok(Err(StorageError::ArtifactNotFound(_)))
                    | Ok(Err(StorageError::InvalidArtifactName(_))) => {
                        debug!("Artifact {} not found", name);
                        text(StatusCode::NOT_FOUND, "Not Found")
                    }
                    Ok(Err(e)) => {
                        error!("Failed to read artifact {}: {}", name, e);
                        text(StatusCode::INTERNAL_SERVER_ERROR, "Could not read image")
                    }
                    Err(e) => {
                        error!("Artifact reader task failed for {}: {}", name, e);
                        text(StatusCode::INTERNAL_SERVER_ERROR, "Could not read image")
                    }
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// POST /jiraShipped
pub fn trigger_route(
    coordinator: Arc<IntakeCoordinator>,
    ack: AckMode,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("jiraShipped")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_TRIGGER_BODY))
        .and(warp::body::bytes())
        .and_then(move |body: Bytes| {
            let coordinator = coordinator.clone();
            async move { Ok::<_, Rejection>(handle_trigger_request(coordinator, ack, body).await) }
        })
        .recover(reject_unreadable_trigger_body)
}

/// Oversized or unsized webhook bodies get the same answer as malformed ones.
/// Every other rejection passes through untouched.
async fn reject_unreadable_trigger_body(err: Rejection) -> Result<reply::Response, Rejection> {
    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        info!("Trigger body exceeds {} bytes", MAX_TRIGGER_BODY);
        return Ok(text(StatusCode::INTERNAL_SERVER_ERROR, "Invalid Payload"));
    }
    if err.find::<warp::reject::LengthRequired>().is_some() {
        info!("Trigger body sent without a content length");
        return Ok(text(StatusCode::INTERNAL_SERVER_ERROR, "Invalid Payload"));
    }
    Err(err)
}

/// Answers a webhook.
///
/// With [`AckMode::Accepted`] the caller gets `200 OK` as soon as the device
/// produced an image; writing the artifact and the index record continues in a
/// spawned task, so a storage failure is only visible in the logs. With
/// [`AckMode::Durable`] the answer waits for both writes.
async fn handle_trigger_request(
    coordinator: Arc<IntakeCoordinator>,
    ack: AckMode,
    body: Bytes,
) -> reply::Response {
    let payload: TriggerPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            info!("Trigger body is not a valid payload: {}", e);
            return text(StatusCode::INTERNAL_SERVER_ERROR, "Invalid Payload");
        }
    };
    info!(
        "Trigger received: key={:?} description={:?}",
        payload.key, payload.description
    );

    let acquired = match coordinator.acquire(payload).await {
        Ok(acquired) => acquired,
        Err(IntakeError::InvalidPayload(_)) => {
            return text(StatusCode::INTERNAL_SERVER_ERROR, "Invalid Payload")
        }
        Err(_) => return text(StatusCode::INTERNAL_SERVER_ERROR, "Capturing picture failed"),
    };

    match ack {
        AckMode::Accepted => {
            let trace_id = acquired.trace_id;
            tokio::spawn(async move {
                // Failures are logged by the coordinator.
                if coordinator.persist(acquired).await.is_err() {
                    debug!("[{}] Background persistence failed", trace_id);
                }
            });
            text(StatusCode::OK, "OK")
        }
        AckMode::Durable => match coordinator.persist(acquired).await {
            Ok(_) => text(StatusCode::OK, "OK"),
            Err(_) => text(StatusCode::INTERNAL_SERVER_ERROR, "Could not store image"),
        },
    }
}

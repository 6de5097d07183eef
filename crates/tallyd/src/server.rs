//! Webhook ingress.
//!
//! One endpoint accepts the forge's JSON payloads and acknowledges them
//! before any work happens: the pipeline runs on the background workers,
//! and the caller never waits on it. A body that is not JSON at all is a
//! 500; a full queue is a 503; everything else is a 202 — including
//! payloads that later fail classification, which the workers log and
//! drop without notifying anyone.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use tally_ci::Pipeline;
use tally_core::{TallyConfig, WebhookEvent};

use crate::queue;

#[derive(Clone)]
struct AppState {
    queue: mpsc::Sender<WebhookEvent>,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: &'static str,
    message: String,
}

impl StatusBody {
    fn accepted() -> Self {
        Self {
            status: "accepted",
            message: "webhook is being processed".to_string(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: "error",
            message,
        }
    }
}

/// Assemble the daemon's routes.
fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/healthz", get(handle_health))
        .with_state(state)
}

/// Start the workers and run the server (blocks until shutdown).
pub async fn serve(config: &TallyConfig, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let queue = queue::start_workers(
        pipeline,
        config.server.workers,
        config.server.queue_capacity,
    );
    let app = router(AppState { queue });

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("cannot bind {}: {e}", config.server.bind_addr))?;
    info!("tallyd listening on {}", config.server.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// `POST /webhook`
async fn handle_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<StatusBody>) {
    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "webhook body could not be parsed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusBody::error(e.to_string())),
            );
        }
    };

    match state.queue.try_send(event) {
        Ok(()) => {
            info!("webhook accepted, processing in background");
            (StatusCode::ACCEPTED, Json(StatusBody::accepted()))
        }
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!("event queue full, rejecting webhook");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(StatusBody::error("event queue is full".to_string())),
            )
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            warn!("event queue closed, rejecting webhook");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusBody::error("worker pool is not running".to_string())),
            )
        }
    }
}

/// `GET /healthz`
async fn handle_health() -> (StatusCode, Json<StatusBody>) {
    (
        StatusCode::OK,
        Json(StatusBody {
            status: "ok",
            message: "alive".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_capacity(capacity: usize) -> (AppState, mpsc::Receiver<WebhookEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (AppState { queue: tx }, rx)
    }

    #[tokio::test]
    async fn valid_json_is_accepted_and_enqueued() {
        let (state, mut rx) = state_with_capacity(4);
        let body = Bytes::from_static(
            br#"{"repository": {"clone_url": "https://x/y.git"}, "ref": "refs/heads/main", "after": "abc"}"#,
        );

        let (status, _) = handle_webhook(State(state), body).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn unclassifiable_json_is_still_accepted() {
        // Classification failures are the workers' concern; ingress only
        // rejects bodies that are not JSON objects at all.
        let (state, mut rx) = state_with_capacity(4);
        let body = Bytes::from_static(br#"{"zen": "Design for failure."}"#);

        let (status, _) = handle_webhook(State(state), body).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn non_json_body_is_a_500() {
        let (state, mut rx) = state_with_capacity(4);
        let body = Bytes::from_static(b"this is not json");

        let (status, response) = handle_webhook(State(state), body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.0.status, "error");
        assert!(rx.try_recv().is_err(), "nothing should be enqueued");
    }

    #[tokio::test]
    async fn full_queue_is_a_503() {
        let (state, _rx) = state_with_capacity(1);
        let body = Bytes::from_static(br#"{"after": "abc"}"#);

        let (first, _) = handle_webhook(State(state.clone()), body.clone()).await;
        assert_eq!(first, StatusCode::ACCEPTED);

        let (second, _) = handle_webhook(State(state), body).await;
        assert_eq!(second, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let (status, response) = handle_health().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.0.status, "ok");
    }
}

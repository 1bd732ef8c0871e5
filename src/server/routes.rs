use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use log::{info, warn};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::poller::SnapshotSource;
use crate::snapshot::{PipelineId, StatusResponse, MISSING_PARAMETERS};

/// Shared state of the status endpoint.
///
/// `source` is `None` when no CircleCI token is configured; every request is
/// then answered with the missing-parameters error.
#[derive(Clone)]
pub struct StatusState {
    source: Option<Arc<dyn SnapshotSource>>,
}

impl StatusState {
    pub fn new(source: Option<Arc<dyn SnapshotSource>>) -> Self {
        Self { source }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "pipelineId")]
    pipeline_id: Option<String>,
}

pub fn router(state: StatusState) -> Router {
    Router::new()
        .route("/status", get(status))
        .with_state(state)
}

async fn status(
    State(state): State<StatusState>,
    Query(query): Query<StatusQuery>,
) -> Json<StatusResponse> {
    let pipeline_id = query
        .pipeline_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    let (Some(pipeline_id), Some(source)) = (pipeline_id, state.source.as_ref()) else {
        return Json(StatusResponse::failure(MISSING_PARAMETERS));
    };

    let pipeline_id = PipelineId::from(pipeline_id);
    match source.fetch_snapshot(&pipeline_id).await {
        Ok(snapshot) => Json(StatusResponse::from(snapshot)),
        Err(e) => {
            warn!("Status for pipeline {pipeline_id} unavailable: {e}");
            Json(StatusResponse::from(&e))
        }
    }
}

/// Serves the status endpoint until `shutdown` is cancelled.
pub async fn serve(
    bind_address: SocketAddr,
    state: StatusState,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    info!("Serving GET /status on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

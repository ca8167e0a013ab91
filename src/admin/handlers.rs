use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::operation::{OpError, OpRequest};
use crate::region::RegionStats;
use crate::registry::UpstreamSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub region: RegionStats,
}

/// HTTP status for a rejected operation.
pub fn error_status(error: &OpError) -> StatusCode {
    match error {
        OpError::Conflict { .. } => StatusCode::CONFLICT,
        OpError::UpstreamNotFound(_) => StatusCode::NOT_FOUND,
        OpError::ResourceExhausted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        OpError::NotFound { .. }
        | OpError::LastPeer { .. }
        | OpError::InvalidAddress { .. }
        | OpError::InvalidDescriptor(_)
        | OpError::BadParameter { .. } => StatusCode::BAD_REQUEST,
    }
}

/// `GET /dynamic`: apply one operation and return the resulting listing.
pub async fn dynamic(
    State(state): State<AdminState>,
    Query(request): Query<OpRequest>,
) -> Response {
    let engine = state.engine.clone();
    let result = tokio::task::spawn_blocking(move || engine.apply_request(&request)).await;

    match result {
        Ok(Ok(outcome)) => (StatusCode::OK, outcome.render()).into_response(),
        Ok(Err(e)) => (error_status(&e), format!("{e}\n")).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Operation task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        region: state.engine.stats(),
    })
}

pub async fn get_upstreams(State(state): State<AdminState>) -> Json<Vec<UpstreamSnapshot>> {
    Json(state.engine.snapshots())
}

/// Administrative endpoints
///
/// # Endpoints
///
/// - `POST /v1/admin/sweep` - Run the orphaned-membership sweep now
///
/// The watcher already sweeps on its own; this endpoint exists for
/// operators who want a sweep on demand after manual data surgery.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{app::AppState, error::ApiResult};
use staynest_shared::sweep::{sweep, DEFAULT_PAGE_SIZE};

/// Sweep response
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    /// Number of orphaned memberships deleted by this run
    pub deleted: u64,
}

/// Run the orphan sweep immediately
///
/// # Errors
///
/// - `503 Service Unavailable`: Record store unreachable
pub async fn run_sweep(State(state): State<AppState>) -> ApiResult<Json<SweepResponse>> {
    let deleted = sweep(state.store.as_ref(), DEFAULT_PAGE_SIZE).await?;
    tracing::info!(deleted, "On-demand sweep complete");
    Ok(Json(SweepResponse { deleted }))
}

//! Health check endpoint

use axum::{Json, extract::State};

use crate::api::{
    state::ApiState,
    types::{HealthResponse, OverallHealth},
};

/// GET /api/v1/health
///
/// Reports `unknown` until the health agent has completed a cycle.
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let checks = state.query.get_health_status().await;

    Json(HealthResponse {
        status: OverallHealth::of(checks.as_ref()),
        timestamp: checks.as_ref().map(|status| status.timestamp),
        checks,
    })
}

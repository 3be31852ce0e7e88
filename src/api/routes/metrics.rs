//! Metric endpoints

use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    CollectionResult,
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::{HistoryQuery, HistoryResponse},
    },
};

const DEFAULT_HISTORY_LIMIT: usize = 50;

/// GET /api/v1/metrics
pub async fn latest(State(state): State<ApiState>) -> ApiResult<Json<CollectionResult>> {
    state
        .query
        .get_latest()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No metrics available".to_string()))
}

/// GET /api/v1/metrics/history?limit=N
pub async fn history(
    State(state): State<ApiState>,
    Query(params): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let metrics = state.query.get_history(limit).await;

    Json(HistoryResponse {
        count: metrics.len(),
        metrics,
    })
}

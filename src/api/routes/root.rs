use axum::{Json, response::Redirect};

use crate::api::types::IndexResponse;

/// GET /
pub async fn redirect() -> Redirect {
    Redirect::permanent("/api/v1/")
}

/// GET /api/v1/
pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "hostwatch monitoring service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

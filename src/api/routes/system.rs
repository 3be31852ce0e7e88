use axum::Json;

use crate::{PlatformInfo, api::error::ApiResult};

/// GET /api/v1/system/info
pub async fn system_info() -> ApiResult<Json<PlatformInfo>> {
    let info = tokio::task::spawn_blocking(PlatformInfo::gather).await?;
    Ok(Json(info))
}

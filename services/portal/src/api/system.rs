//! System/health API handlers.
//!
//! Health checks must be fast and side-effect free; they do not call the
//! remote API or the identity provider.
use crate::api::types::HealthStatus;
use axum::Json;

#[utoipa::path(
    get,
    path = "/v1/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Portal health", body = HealthStatus)
    )
)]
pub(crate) async fn system_health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}

//! Liveness probe.

use axum::response::Json;

use crate::api::models::auth::MessageResponse;

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    summary = "Health check",
    description = "Liveness probe. Returns 200 when the service is running.",
    responses(
        (status = 200, description = "Service is running", body = MessageResponse),
    )
)]
pub async fn health() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "ok".to_string(),
    })
}

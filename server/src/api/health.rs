use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub message: &'static str,
}

/// Liveness check. Does not touch the database.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse { message: "pong" })
}

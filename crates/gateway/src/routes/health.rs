use axum::Json;
use serde_json::{json, Value};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = OK, description = "Gateway is up")
    ))]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

use axum::Json;
use serde_json::{json, Value};

/// GET /health — liveness probe, returns server metadata.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api — plain-text probe kept for parity with platform setup guides.
pub async fn api_probe_handler() -> &'static str {
    "API is running"
}

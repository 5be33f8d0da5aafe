//! Plain HTTP endpoints.

use axum::Json;
use serde_json::{Value, json};

/// Liveness probe.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "message": "Twilio Media Stream Server is running!" }))
}

use axum::Json;
use serde_json::{json, Value};

use crate::generation::prompts::SAFETY_PREAMBLE_VERSION;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "tailor-api",
        "safety_preamble_version": SAFETY_PREAMBLE_VERSION
    }))
}

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service version and whether the scoring artifacts are loaded.
/// Never triggers a load itself.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let artifacts_loaded = state.artifacts.is_loaded().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "ranker-api",
        "artifacts_loaded": artifacts_loaded
    }))
}

pub mod health;
pub mod rankings;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/scales", get(rankings::handle_get_scales))
        // Ranking runs
        .route("/api/v1/rankings", post(rankings::handle_create_ranking))
        .route(
            "/api/v1/rankings/text",
            post(rankings::handle_create_ranking_from_text),
        )
        .route("/api/v1/rankings/latest", get(rankings::handle_get_latest))
        .route(
            "/api/v1/rankings/latest/export",
            get(rankings::handle_export_latest),
        )
        // Artifacts
        .route(
            "/api/v1/artifacts/reload",
            post(rankings::handle_reload_artifacts),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

mod artifacts;
mod config;
mod documents;
mod errors;
mod routes;
mod scoring;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::artifacts::ArtifactStore;
use crate::config::Config;
use crate::documents::PdfTextProvider;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Ranker API v{}", env!("CARGO_PKG_VERSION"));

    // Load artifacts eagerly so the first request does not pay for it.
    // A failure here is not fatal: requests report 503 until a reload succeeds.
    let artifacts = ArtifactStore::new(config.artifact_dir.clone());
    if let Err(e) = artifacts.get().await {
        warn!("Artifacts not loaded at startup: {e}");
    }

    let text_provider = Arc::new(PdfTextProvider::new(config.extraction_timeout));
    info!(
        "Scoring policy: adherence={:?} potential_threshold={}",
        config.adherence_rule, config.potential_threshold
    );

    // Build app state
    let state = AppState::new(config.clone(), artifacts, text_provider);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the UI host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

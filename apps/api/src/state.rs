use std::sync::Arc;

use tokio::sync::RwLock;

use crate::artifacts::ArtifactStore;
use crate::config::Config;
use crate::documents::DocumentTextProvider;
use crate::scoring::composer::ScoringPolicy;
use crate::scoring::models::RankingRun;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pre-trained scaler, vectorizer and classifier. Lazily loaded, reloadable.
    pub artifacts: ArtifactStore,
    /// Pluggable document text extraction. Default: PdfTextProvider.
    pub text_provider: Arc<dyn DocumentTextProvider>,
    pub policy: ScoringPolicy,
    /// Most recent completed run; replaced wholesale by each accepted submission.
    pub latest_run: Arc<RwLock<Option<Arc<RankingRun>>>>,
}

impl AppState {
    pub fn new(
        config: Config,
        artifacts: ArtifactStore,
        text_provider: Arc<dyn DocumentTextProvider>,
    ) -> Self {
        Self {
            policy: config.scoring_policy(),
            config,
            artifacts,
            text_provider,
            latest_run: Arc::new(RwLock::new(None)),
        }
    }
}

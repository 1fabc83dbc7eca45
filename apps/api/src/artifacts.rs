//! Artifact bundle — the pre-trained scaler, vectorizer and classifier plus
//! the stopword set, loaded once and shared read-only by every ranking run.
//!
//! On-disk layout under `ARTIFACT_DIR`:
//! - `scaler.json`, `vectorizer.json`, `classifier.json` (required)
//! - `stopwords.txt` (optional; built-in Portuguese list otherwise)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::scoring::classifier::{FeatureScaler, FitClassifier};
use crate::scoring::similarity::TfidfVectorizer;
use crate::scoring::text::Stopwords;

pub const SCALER_FILE: &str = "scaler.json";
pub const VECTORIZER_FILE: &str = "vectorizer.json";
pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const STOPWORDS_FILE: &str = "stopwords.txt";

#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("artifact not found: {0}")]
    Missing(PathBuf),

    #[error("failed to read artifact {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact {path} is not valid JSON for its type: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact {path} failed consistency check: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("artifact loader task failed: {0}")]
    Task(String),
}

/// Everything a ranking run needs from the artifact store.
#[derive(Debug)]
pub struct ArtifactBundle {
    pub scaler: FeatureScaler,
    pub vectorizer: TfidfVectorizer,
    pub classifier: FitClassifier,
    pub stopwords: Stopwords,
    pub source: Option<PathBuf>,
}

impl ArtifactBundle {
    /// Assembles a bundle from in-memory parts, running the same checks as `load`.
    pub fn new(
        scaler: FeatureScaler,
        vectorizer: TfidfVectorizer,
        classifier: FitClassifier,
        stopwords: Stopwords,
    ) -> Result<Self, ArtifactLoadError> {
        let bundle = Self {
            scaler,
            vectorizer,
            classifier,
            stopwords,
            source: None,
        };
        bundle.validate(Path::new("<memory>"))?;
        Ok(bundle)
    }

    /// Reads and validates every artifact in `dir`. Blocking I/O.
    pub fn load(dir: &Path) -> Result<Self, ArtifactLoadError> {
        let scaler: FeatureScaler = read_json(&dir.join(SCALER_FILE))?;
        let vectorizer: TfidfVectorizer = read_json(&dir.join(VECTORIZER_FILE))?;
        let classifier: FitClassifier = read_json(&dir.join(CLASSIFIER_FILE))?;

        let stopwords_path = dir.join(STOPWORDS_FILE);
        let stopwords = if stopwords_path.exists() {
            let contents = std::fs::read_to_string(&stopwords_path).map_err(|source| {
                ArtifactLoadError::Unreadable {
                    path: stopwords_path.clone(),
                    source,
                }
            })?;
            let parsed = Stopwords::from_lines(&contents);
            if parsed.is_empty() {
                warn!(
                    "{} lists no stopwords, using the built-in Portuguese list",
                    stopwords_path.display()
                );
                Stopwords::portuguese()
            } else {
                parsed
            }
        } else {
            Stopwords::portuguese()
        };

        let bundle = Self {
            scaler,
            vectorizer,
            classifier,
            stopwords,
            source: Some(dir.to_path_buf()),
        };
        bundle.validate(dir)?;

        info!(
            "Artifacts loaded from {}: vocabulary={} stopwords={}",
            dir.display(),
            bundle.vectorizer.vocabulary.len(),
            bundle.stopwords.len()
        );
        Ok(bundle)
    }

    fn validate(&self, dir: &Path) -> Result<(), ArtifactLoadError> {
        self.scaler
            .validate()
            .map_err(|e| ArtifactLoadError::Corrupt {
                path: dir.join(SCALER_FILE),
                reason: e.to_string(),
            })?;
        self.vectorizer
            .validate()
            .map_err(|e| ArtifactLoadError::Corrupt {
                path: dir.join(VECTORIZER_FILE),
                reason: e.to_string(),
            })?;
        self.classifier
            .validate()
            .map_err(|e| ArtifactLoadError::Corrupt {
                path: dir.join(CLASSIFIER_FILE),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactLoadError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ArtifactLoadError::Missing(path.to_path_buf()))
        }
        Err(source) => {
            return Err(ArtifactLoadError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&bytes).map_err(|source| ArtifactLoadError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Load-once holder for the bundle. Lazily loaded on first use, replaced
/// wholesale on `reload`. A failed load leaves the previous state untouched.
#[derive(Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    current: Arc<RwLock<Option<Arc<ArtifactBundle>>>>,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Store pre-populated with an in-memory bundle.
    pub fn with_bundle(dir: impl Into<PathBuf>, bundle: ArtifactBundle) -> Self {
        Self {
            dir: dir.into(),
            current: Arc::new(RwLock::new(Some(Arc::new(bundle)))),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn is_loaded(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Returns the loaded bundle, loading it first if needed.
    pub async fn get(&self) -> Result<Arc<ArtifactBundle>, ArtifactLoadError> {
        if let Some(bundle) = self.current.read().await.as_ref() {
            return Ok(Arc::clone(bundle));
        }

        let mut slot = self.current.write().await;
        // Another request may have loaded it while we waited for the lock.
        if let Some(bundle) = slot.as_ref() {
            return Ok(Arc::clone(bundle));
        }
        let bundle = Arc::new(self.load_blocking().await?);
        *slot = Some(Arc::clone(&bundle));
        Ok(bundle)
    }

    /// Loads a fresh bundle and swaps it in. Runs already holding the old
    /// bundle keep using it.
    pub async fn reload(&self) -> Result<Arc<ArtifactBundle>, ArtifactLoadError> {
        let bundle = Arc::new(self.load_blocking().await?);
        *self.current.write().await = Some(Arc::clone(&bundle));
        Ok(bundle)
    }

    async fn load_blocking(&self) -> Result<ArtifactBundle, ArtifactLoadError> {
        let dir = self.dir.clone();
        let result = tokio::task::spawn_blocking(move || ArtifactBundle::load(&dir))
            .await
            .map_err(|e| ArtifactLoadError::Task(e.to_string()))?;
        if let Err(e) = &result {
            error!("Artifact load failed: {e}");
        }
        result
    }
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::scoring::adherence::AdherenceRule;
use crate::scoring::composer::{ScoringPolicy, DEFAULT_POTENTIAL_THRESHOLD, RECOMMENDED_THRESHOLD};

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub artifact_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub extraction_timeout: Duration,
    pub adherence_rule: AdherenceRule,
    pub potential_threshold: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let potential_threshold = parse_env("POTENTIAL_THRESHOLD", DEFAULT_POTENTIAL_THRESHOLD)?;
        if !(0.0..=RECOMMENDED_THRESHOLD).contains(&potential_threshold) {
            anyhow::bail!(
                "POTENTIAL_THRESHOLD must be within [0, {RECOMMENDED_THRESHOLD}], got {potential_threshold}"
            );
        }

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            artifact_dir: std::env::var("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("artifacts")),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
            extraction_timeout: Duration::from_secs(parse_env("EXTRACTION_TIMEOUT_SECS", 30)?),
            adherence_rule: match std::env::var("ADHERENCE_RULE") {
                Ok(raw) => raw
                    .parse()
                    .map_err(anyhow::Error::msg)
                    .context("ADHERENCE_RULE is invalid")?,
                Err(_) => AdherenceRule::default(),
            },
            potential_threshold,
        })
    }

    /// Product decisions applied to every run.
    pub fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            adherence_rule: self.adherence_rule,
            potential_threshold: self.potential_threshold,
            ..ScoringPolicy::default()
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Defaults without touching the process environment.
    pub fn for_tests(artifact_dir: impl Into<PathBuf>) -> Self {
        Config {
            port: 0,
            rust_log: "debug".to_string(),
            artifact_dir: artifact_dir.into(),
            max_upload_bytes: 1024 * 1024,
            extraction_timeout: Duration::from_secs(5),
            adherence_rule: AdherenceRule::Graded,
            potential_threshold: DEFAULT_POTENTIAL_THRESHOLD,
        }
    }
}

//! Data model of a ranking run: job requisition, candidate documents,
//! per-candidate results and the run aggregate.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::scoring::adherence::{AdherenceBreakdown, LevelValues};
use crate::scoring::classifier::FeatureVector;
use crate::scoring::composer::CandidateStatus;
use crate::scoring::levels::{
    AcademicLevel, LanguageLevel, LevelError, OrdinalScale, ProfessionalLevel,
};

/// Default bound for missing-term previews in displays and exports.
pub const MISSING_PREVIEW_LEN: usize = 10;

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldIssue {
    Missing { field: String },
    InvalidLabel { field: String, label: String },
}

impl FieldIssue {
    pub fn missing(field: impl Into<String>) -> Self {
        FieldIssue::Missing {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            FieldIssue::Missing { field } | FieldIssue::InvalidLabel { field, .. } => field,
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::Missing { field } => write!(f, "{field} is required"),
            FieldIssue::InvalidLabel { field, label } => {
                write!(f, "{field} has unknown value '{label}'")
            }
        }
    }
}

/// Every problem found in a submission, reported together.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("invalid submission: {}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// `Ok(())` when nothing was collected.
    pub fn check(issues: Vec<FieldIssue>) -> Result<(), ValidationError> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Job
// ────────────────────────────────────────────────────────────────────────────

/// A job opening as submitted for one run. Levels use the exact-selection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequisition {
    pub title: String,
    pub raw_requirements: String,
    pub required_education: AcademicLevel,
    pub required_english: LanguageLevel,
    #[serde(default)]
    pub required_spanish: LanguageLevel,
    pub required_seniority: ProfessionalLevel,
}

impl JobRequisition {
    pub fn required_levels(&self) -> LevelValues {
        LevelValues {
            academic: self.required_education.value(),
            english: self.required_english.value(),
            spanish: self.required_spanish.value(),
        }
    }
}

/// Job fields as free-form labels, before exact-selection mapping.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobForm {
    pub title: Option<String>,
    pub requirements: Option<String>,
    pub education: Option<String>,
    pub english: Option<String>,
    pub spanish: Option<String>,
    pub seniority: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required_label<S: OrdinalScale>(
    field: &str,
    value: &Option<String>,
    issues: &mut Vec<FieldIssue>,
) -> Option<S> {
    let Some(label) = present(value) else {
        issues.push(FieldIssue::missing(field));
        return None;
    };
    optional_label(field, label, issues)
}

fn optional_label<S: OrdinalScale>(
    field: &str,
    label: &str,
    issues: &mut Vec<FieldIssue>,
) -> Option<S> {
    match S::from_label(label) {
        Ok(level) => Some(level),
        Err(LevelError::UnknownLabel { label, .. }) => {
            issues.push(FieldIssue::InvalidLabel {
                field: field.to_string(),
                label,
            });
            None
        }
    }
}

impl JobForm {
    /// Maps every label, collecting all missing or unknown fields at once.
    /// Title and requirements are passed through; the pipeline checks them.
    pub fn into_requisition(self) -> Result<JobRequisition, ValidationError> {
        let mut issues = Vec::new();

        let education = required_label::<AcademicLevel>("education", &self.education, &mut issues);
        let english = required_label::<LanguageLevel>("english", &self.english, &mut issues);
        let seniority =
            required_label::<ProfessionalLevel>("seniority", &self.seniority, &mut issues);
        let spanish = match present(&self.spanish) {
            Some(label) => optional_label::<LanguageLevel>("spanish", label, &mut issues),
            None => Some(LanguageLevel::Nenhum),
        };

        if present(&self.title).is_none() {
            issues.push(FieldIssue::missing("title"));
        }
        if present(&self.requirements).is_none() {
            issues.push(FieldIssue::missing("requirements"));
        }

        match (education, english, spanish, seniority) {
            (Some(education), Some(english), Some(spanish), Some(seniority))
                if issues.is_empty() =>
            {
                Ok(JobRequisition {
                    title: self.title.unwrap_or_default().trim().to_string(),
                    raw_requirements: self.requirements.unwrap_or_default(),
                    required_education: education,
                    required_english: english,
                    required_spanish: spanish,
                    required_seniority: seniority,
                })
            }
            _ => Err(ValidationError { issues }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Candidates
// ────────────────────────────────────────────────────────────────────────────

/// Levels declared by the caller for one candidate (exact-selection policy).
/// Education and English are required once a declaration is given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeclaredLevels {
    pub education: Option<String>,
    pub english: Option<String>,
    pub spanish: Option<String>,
}

/// One résumé as handed to the engine: display name plus extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDocument {
    pub name: String,
    #[serde(alias = "text")]
    pub raw_text: String,
    #[serde(default)]
    pub declared: Option<DeclaredLevels>,
}

impl CandidateDocument {
    pub fn new(name: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_text: raw_text.into(),
            declared: None,
        }
    }
}

/// How a candidate's levels were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSource {
    /// Exact selection of caller-declared labels.
    Declared,
    /// Best match found in the résumé text.
    InferredFromText,
}

/// Ranked summary row for one successfully processed candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    /// 1-based upload position; stable within the run.
    pub id: usize,
    pub name: String,
    pub probability: f64,
    pub match_percent: f64,
    pub score_combined: f64,
    pub status: CandidateStatus,
    pub similarity: f64,
    pub matched_terms: BTreeSet<String>,
    pub missing_terms: BTreeSet<String>,
    pub matched_term_count: usize,
    pub total_terms: usize,
    pub processed_text_preview: String,
    /// True when the classifier failed and the default probability was used.
    pub prediction_degraded: bool,
}

/// Explanation detail, aligned 1:1 (same order, same id) with the results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDetail {
    pub id: usize,
    pub name: String,
    pub matched_terms: BTreeSet<String>,
    pub missing_terms: BTreeSet<String>,
    pub adherence: AdherenceBreakdown,
    pub candidate_levels: LevelValues,
    pub level_source: LevelSource,
    pub features: FeatureVector,
    pub probability: f64,
    pub match_percent: f64,
    pub similarity: f64,
    pub processed_text_preview: String,
}

impl CandidateDetail {
    /// First `n` missing terms in sorted order.
    pub fn missing_preview(&self, n: usize) -> Vec<&str> {
        self.missing_terms.iter().take(n).map(String::as_str).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Run aggregate
// ────────────────────────────────────────────────────────────────────────────

/// Recoverable per-candidate problems, attached to the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// No text could be extracted; the candidate was dropped.
    EmptyDocument { candidate: String },
    /// Scaling or prediction failed; the default probability was used.
    PredictionFallback { candidate: String, reason: String },
    /// Any other failure; the candidate was skipped.
    CandidateFailed { candidate: String, reason: String },
    /// No candidate produced a result.
    NothingProcessed,
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::EmptyDocument { candidate } => {
                write!(f, "{candidate}: document is empty or could not be read")
            }
            RunWarning::PredictionFallback { candidate, reason } => {
                write!(f, "{candidate}: prediction failed ({reason}); used default probability")
            }
            RunWarning::CandidateFailed { candidate, reason } => {
                write!(f, "{candidate}: processing failed ({reason})")
            }
            RunWarning::NothingProcessed => write!(f, "no candidate could be processed"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub recommended: usize,
    pub potential: usize,
    pub low_fit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub submitted: usize,
    pub processed: usize,
    pub mean_score: Option<f64>,
    pub best_score: Option<f64>,
    pub by_status: StatusCounts,
}

impl RunSummary {
    pub fn from_results(submitted: usize, results: &[CandidateResult]) -> Self {
        let mut by_status = StatusCounts::default();
        for r in results {
            match r.status {
                CandidateStatus::Recommended => by_status.recommended += 1,
                CandidateStatus::Potential => by_status.potential += 1,
                CandidateStatus::LowFit => by_status.low_fit += 1,
            }
        }
        let scores = results.iter().map(|r| r.score_combined);
        let mean_score = if results.is_empty() {
            None
        } else {
            Some(scores.clone().sum::<f64>() / results.len() as f64)
        };
        Self {
            submitted,
            processed: results.len(),
            mean_score,
            best_score: scores.reduce(f64::max),
            by_status,
        }
    }
}

/// One complete, immutable analysis. The next submission replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRun {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub job: JobRequisition,
    pub results: Vec<CandidateResult>,
    pub details: Vec<CandidateDetail>,
    pub warnings: Vec<RunWarning>,
    pub summary: RunSummary,
}

impl RankingRun {
    pub fn detail(&self, id: usize) -> Option<&CandidateDetail> {
        self.details.iter().find(|d| d.id == id)
    }
}

//! Ranking Pipeline — runs every candidate of a submission through the
//! normalizer, extractor, level mapper, similarity, adherence, classifier and
//! composer, then orders the results by combined score.
//!
//! Stages: received → validated → per-candidate processing → aggregated →
//! ready. A run that fails validation produces nothing. A single candidate
//! failing never fails the run; it becomes a warning.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::artifacts::ArtifactBundle;
use crate::scoring::adherence::{AdherenceBreakdown, LevelValues};
use crate::scoring::classifier::{predict_fit, FeatureVector};
use crate::scoring::composer::{compose, ScoringPolicy};
use crate::scoring::levels::{
    language_level_in_text, AcademicLevel, Language, LanguageLevel, LevelError, OrdinalScale,
};
use crate::scoring::models::{
    CandidateDetail, CandidateDocument, CandidateResult, DeclaredLevels, FieldIssue,
    JobRequisition, LevelSource, RankingRun, RunSummary, RunWarning, ValidationError,
};
use crate::scoring::similarity::similarity;
use crate::scoring::text::{
    extract_competencies, match_competencies, match_percent, normalize, preview,
};

/// Characters of normalized text kept in previews.
pub const PREVIEW_CHARS: usize = 500;

/// Failure while scoring one candidate. Reported as a warning, never fatal.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error(transparent)]
    Level(#[from] LevelError),

    #[error("non-finite {0}")]
    NonFinite(&'static str),
}

#[derive(Debug, Clone, Copy)]
enum RunStage {
    Received,
    Validated,
    Processing,
    Aggregated,
    Ready,
}

/// Job-derived values shared by every candidate of a run.
struct JobContext {
    competencies: BTreeSet<String>,
    requirement_text: String,
    required: LevelValues,
    seniority: f64,
}

struct Scored {
    result: CandidateResult,
    detail: CandidateDetail,
    degraded: Option<String>,
}

pub struct RankingPipeline {
    artifacts: Arc<ArtifactBundle>,
    policy: ScoringPolicy,
}

impl RankingPipeline {
    pub fn new(artifacts: Arc<ArtifactBundle>, policy: ScoringPolicy) -> Self {
        Self { artifacts, policy }
    }

    /// Scores and ranks `documents` against `job`.
    ///
    /// Validation errors are returned before any candidate is touched. Empty
    /// documents and per-candidate failures are dropped with a warning.
    /// Results are sorted by score descending; ties keep upload order.
    pub fn run(
        &self,
        job: JobRequisition,
        documents: Vec<CandidateDocument>,
    ) -> Result<RankingRun, ValidationError> {
        let run_id = Uuid::new_v4();
        stage(run_id, RunStage::Received);

        validate_submission(&job, &documents)?;
        stage(run_id, RunStage::Validated);

        let ctx = self.job_context(&job);
        let submitted = documents.len();
        let mut warnings = Vec::new();
        let mut scored = Vec::with_capacity(submitted);

        stage(run_id, RunStage::Processing);
        for (index, document) in documents.into_iter().enumerate() {
            let id = index + 1;
            if document.raw_text.trim().is_empty() {
                push_warning(
                    &mut warnings,
                    RunWarning::EmptyDocument {
                        candidate: document.name,
                    },
                );
                continue;
            }

            match self.score_candidate(id, &document, &ctx) {
                Ok(candidate) => {
                    if let Some(reason) = &candidate.degraded {
                        push_warning(
                            &mut warnings,
                            RunWarning::PredictionFallback {
                                candidate: document.name.clone(),
                                reason: reason.clone(),
                            },
                        );
                    }
                    scored.push(candidate);
                }
                Err(e) => push_warning(
                    &mut warnings,
                    RunWarning::CandidateFailed {
                        candidate: document.name,
                        reason: e.to_string(),
                    },
                ),
            }
        }

        if scored.is_empty() {
            push_warning(&mut warnings, RunWarning::NothingProcessed);
        }

        // sort_by is stable: equal scores keep upload order.
        scored.sort_by(|a, b| {
            b.result
                .score_combined
                .total_cmp(&a.result.score_combined)
        });
        let (results, details): (Vec<_>, Vec<_>) =
            scored.into_iter().map(|s| (s.result, s.detail)).unzip();
        stage(run_id, RunStage::Aggregated);

        let summary = RunSummary::from_results(submitted, &results);
        info!(
            "Ranking run {} for '{}': {}/{} candidates scored, {} warnings",
            run_id,
            job.title,
            summary.processed,
            submitted,
            warnings.len()
        );
        stage(run_id, RunStage::Ready);

        Ok(RankingRun {
            run_id,
            created_at: Utc::now(),
            job,
            results,
            details,
            warnings,
            summary,
        })
    }

    fn job_context(&self, job: &JobRequisition) -> JobContext {
        let competencies = extract_competencies(&job.raw_requirements);
        let joined = competencies.iter().cloned().collect::<Vec<_>>().join(" ");
        JobContext {
            requirement_text: normalize(&joined, &self.artifacts.stopwords),
            competencies,
            required: job.required_levels(),
            seniority: job.required_seniority.normalized(),
        }
    }

    fn score_candidate(
        &self,
        id: usize,
        document: &CandidateDocument,
        ctx: &JobContext,
    ) -> Result<Scored, ScoringError> {
        let processed = normalize(&document.raw_text, &self.artifacts.stopwords);
        let (matched, missing) = match_competencies(&ctx.competencies, &document.raw_text);
        let match_pct = match_percent(matched.len(), ctx.competencies.len());
        let sim = similarity(&ctx.requirement_text, &processed, &self.artifacts.vectorizer);

        let (levels, level_source) = candidate_levels(document)?;
        let adherence =
            AdherenceBreakdown::evaluate(&levels, &ctx.required, self.policy.adherence_rule);

        let features = FeatureVector {
            match_percent: match_pct,
            similarity: sim,
            matched_term_count: matched.len() as f64,
            academic_adherence: adherence.academic,
            english_adherence: adherence.english,
            spanish_adherence: adherence.spanish,
            normalized_seniority: ctx.seniority,
        };
        if features.to_array().iter().any(|v| !v.is_finite()) {
            return Err(ScoringError::NonFinite("feature"));
        }

        let prediction = predict_fit(&features, &self.artifacts.scaler, &self.artifacts.classifier);
        let score = compose(
            prediction.probability,
            match_pct,
            sim,
            adherence.academic,
            &self.policy.weights,
        );
        if !score.is_finite() {
            return Err(ScoringError::NonFinite("score"));
        }

        debug!(
            candidate = %document.name,
            score,
            probability = prediction.probability,
            match_pct,
            similarity = sim,
            "candidate scored"
        );

        let text_preview = preview(&processed, PREVIEW_CHARS);
        let result = CandidateResult {
            id,
            name: document.name.clone(),
            probability: prediction.probability,
            match_percent: match_pct,
            score_combined: score,
            status: self.policy.status(score),
            similarity: sim,
            matched_term_count: matched.len(),
            total_terms: ctx.competencies.len(),
            matched_terms: matched.clone(),
            missing_terms: missing.clone(),
            processed_text_preview: text_preview.clone(),
            prediction_degraded: prediction.degraded.is_some(),
        };
        let detail = CandidateDetail {
            id,
            name: document.name.clone(),
            matched_terms: matched,
            missing_terms: missing,
            adherence,
            candidate_levels: levels,
            level_source,
            features,
            probability: prediction.probability,
            match_percent: match_pct,
            similarity: sim,
            processed_text_preview: text_preview,
        };

        Ok(Scored {
            result,
            detail,
            degraded: prediction.degraded,
        })
    }
}

fn stage(run_id: Uuid, stage: RunStage) {
    debug!(%run_id, ?stage, "ranking run stage");
}

fn push_warning(warnings: &mut Vec<RunWarning>, warning: RunWarning) {
    warn!("{warning}");
    warnings.push(warning);
}

/// Checks everything that would make the whole submission meaningless and
/// reports every violation at once.
///
/// Requirements that hold text but no terms are accepted; every candidate
/// then scores a match percent of 0.
pub fn validate_submission(
    job: &JobRequisition,
    documents: &[CandidateDocument],
) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    if job.title.trim().is_empty() {
        issues.push(FieldIssue::missing("title"));
    }
    if job.raw_requirements.trim().is_empty() {
        issues.push(FieldIssue::missing("requirements"));
    }
    issues.extend(document_issues(documents));

    ValidationError::check(issues)
}

/// Candidate-side violations: no documents, or a declaration missing its
/// required labels. Callers that reject the job form first add these so the
/// caller still sees every problem.
pub fn document_issues(documents: &[CandidateDocument]) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    if documents.is_empty() {
        issues.push(FieldIssue::missing("resumes"));
    }

    for (index, document) in documents.iter().enumerate() {
        let Some(declared) = &document.declared else {
            continue;
        };
        if is_blank(&declared.education) {
            issues.push(FieldIssue::missing(format!("candidates[{}].education", index + 1)));
        }
        if is_blank(&declared.english) {
            issues.push(FieldIssue::missing(format!("candidates[{}].english", index + 1)));
        }
    }
    issues
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Declared labels win (exact selection); otherwise levels are inferred
/// from the résumé text (best match).
fn candidate_levels(
    document: &CandidateDocument,
) -> Result<(LevelValues, LevelSource), LevelError> {
    match &document.declared {
        Some(declared) => Ok((declared_levels(declared)?, LevelSource::Declared)),
        None => {
            let text = &document.raw_text;
            let levels = LevelValues {
                academic: AcademicLevel::best_match_in_text(text),
                english: language_level_in_text(text, Language::English),
                spanish: language_level_in_text(text, Language::Spanish),
            };
            Ok((levels, LevelSource::InferredFromText))
        }
    }
}

fn declared_levels(declared: &DeclaredLevels) -> Result<LevelValues, LevelError> {
    let academic = AcademicLevel::from_label(declared.education.as_deref().unwrap_or(""))?;
    let english = LanguageLevel::from_label(declared.english.as_deref().unwrap_or(""))?;
    let spanish = declared
        .spanish
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(LanguageLevel::from_label)
        .transpose()?
        .unwrap_or_default();

    Ok(LevelValues {
        academic: academic.value(),
        english: english.value(),
        spanish: spanish.value(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::tests::test_bundle;
    use crate::scoring::classifier::tests::identity_scaler;
    use crate::scoring::classifier::{FitClassifier, DEFAULT_PROBABILITY};
    use crate::scoring::composer::CandidateStatus;
    use crate::scoring::levels::ProfessionalLevel;
    use crate::scoring::similarity::tests::sample_vectorizer;
    use crate::scoring::text::Stopwords;

    fn job() -> JobRequisition {
        JobRequisition {
            title: "Engenheiro de Dados".to_string(),
            raw_requirements: "Python, SQL, Power BI".to_string(),
            required_education: AcademicLevel::EnsinoSuperior,
            required_english: LanguageLevel::Intermediario,
            required_spanish: LanguageLevel::Nenhum,
            required_seniority: ProfessionalLevel::Pleno,
        }
    }

    fn pipeline(probability: f64) -> RankingPipeline {
        RankingPipeline::new(Arc::new(test_bundle(probability)), ScoringPolicy::default())
    }

    const STRONG_CV: &str = "Analista com experiência em Python e SQL.\n\
                             Pós-graduação em Engenharia de Dados.\n\
                             Inglês avançado";

    #[test]
    fn test_partial_competency_match() {
        let run = pipeline(0.8)
            .run(job(), vec![CandidateDocument::new("ana.pdf", STRONG_CV)])
            .unwrap();

        let r = &run.results[0];
        assert_eq!(r.id, 1);
        assert_eq!(r.matched_terms, ["python", "sql"].map(String::from).into());
        assert_eq!(r.missing_terms, ["power bi"].map(String::from).into());
        assert_eq!(r.matched_term_count, 2);
        assert_eq!(r.total_terms, 3);
        assert!((r.match_percent - 2.0 / 3.0).abs() < 1e-9);
        assert!(run.warnings.is_empty());
    }

    #[test]
    fn test_inferred_levels_and_adherence() {
        let run = pipeline(0.8)
            .run(job(), vec![CandidateDocument::new("ana.pdf", STRONG_CV)])
            .unwrap();

        let d = &run.details[0];
        assert_eq!(d.level_source, LevelSource::InferredFromText);
        assert_eq!(d.candidate_levels.academic, 3.0);
        assert_eq!(d.candidate_levels.english, 3.0);
        assert_eq!(d.adherence.academic, 1.0);
        assert_eq!(d.adherence.english, 1.0);
        assert_eq!(d.adherence.spanish, 1.0);
        assert!((d.features.normalized_seniority - 0.7).abs() < 1e-9);
        assert_eq!(d.features.matched_term_count, 2.0);
    }

    #[test]
    fn test_score_and_status() {
        let run = pipeline(0.8)
            .run(job(), vec![CandidateDocument::new("ana.pdf", STRONG_CV)])
            .unwrap();

        let r = &run.results[0];
        let expected = 0.3 * 0.8 + 0.4 * (2.0 / 3.0) + 0.2 * r.similarity + 0.1 * 1.0;
        assert!((r.score_combined - expected).abs() < 1e-9);
        assert!(r.similarity > 0.0 && r.similarity <= 1.0);
        assert_eq!(r.status, CandidateStatus::Recommended);
        assert!(!r.prediction_degraded);
        assert_eq!(run.summary.by_status.recommended, 1);
    }

    #[test]
    fn test_declared_levels_take_precedence() {
        let mut doc = CandidateDocument::new("bia.pdf", STRONG_CV);
        doc.declared = Some(DeclaredLevels {
            education: Some("Ensino Fundamental".to_string()),
            english: Some("Básico".to_string()),
            spanish: None,
        });
        let run = pipeline(0.8).run(job(), vec![doc]).unwrap();

        let d = &run.details[0];
        assert_eq!(d.level_source, LevelSource::Declared);
        assert_eq!(d.candidate_levels.academic, 0.5);
        assert_eq!(d.adherence.academic, 0.0);
        assert_eq!(d.adherence.english, 0.5);
    }

    #[test]
    fn test_ranking_is_descending_with_stable_ties() {
        // Three different weak résumés that all score the same, with the
        // strong one uploaded between them.
        let docs = vec![
            CandidateDocument::new("a.pdf", "Experiência com Java"),
            CandidateDocument::new("b.pdf", "Conhecimento em Spark"),
            CandidateDocument::new("c.pdf", STRONG_CV),
            CandidateDocument::new("d.pdf", "Atendimento ao cliente"),
        ];
        let run = pipeline(0.5).run(job(), docs).unwrap();

        let order: Vec<usize> = run.results.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![3, 1, 2, 4]);
        let tied: Vec<f64> = run.results[1..].iter().map(|r| r.score_combined).collect();
        assert!(tied.iter().all(|s| *s == tied[0]), "scores {tied:?}");
        assert!(run.results[0].score_combined > tied[0]);

        let detail_order: Vec<usize> = run.details.iter().map(|d| d.id).collect();
        assert_eq!(detail_order, order);
        let names: Vec<&str> = run.details.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["c.pdf", "a.pdf", "b.pdf", "d.pdf"]);
    }

    #[test]
    fn test_requirements_without_terms_score_zero_match() {
        let mut vague = job();
        vague.raw_requirements = " , , ".to_string();
        let run = pipeline(0.8)
            .run(vague, vec![CandidateDocument::new("ana.pdf", STRONG_CV)])
            .unwrap();

        let r = &run.results[0];
        assert_eq!(r.total_terms, 0);
        assert_eq!(r.match_percent, 0.0);
        assert!(r.matched_terms.is_empty() && r.missing_terms.is_empty());
    }

    #[test]
    fn test_empty_document_is_skipped_with_warning() {
        let docs = vec![
            CandidateDocument::new("scan.pdf", "   \n "),
            CandidateDocument::new("ana.pdf", STRONG_CV),
        ];
        let run = pipeline(0.8).run(job(), docs).unwrap();

        assert_eq!(run.results.len(), 1);
        assert_eq!(run.results[0].id, 2);
        assert_eq!(
            run.warnings,
            vec![RunWarning::EmptyDocument {
                candidate: "scan.pdf".to_string()
            }]
        );
        assert_eq!(run.summary.submitted, 2);
        assert_eq!(run.summary.processed, 1);
    }

    #[test]
    fn test_all_empty_documents_produce_empty_run() {
        let docs = vec![
            CandidateDocument::new("a.pdf", ""),
            CandidateDocument::new("b.pdf", ""),
        ];
        let run = pipeline(0.8).run(job(), docs).unwrap();

        assert!(run.results.is_empty());
        assert!(run.details.is_empty());
        assert_eq!(run.warnings.len(), 3);
        assert_eq!(run.warnings.last(), Some(&RunWarning::NothingProcessed));
    }

    #[test]
    fn test_validation_reports_every_violation() {
        let mut bad_job = job();
        bad_job.title = " ".to_string();
        bad_job.raw_requirements = "  \n ".to_string();
        let err = pipeline(0.8).run(bad_job, Vec::new()).unwrap_err();

        let fields: Vec<&str> = err.issues.iter().map(FieldIssue::field).collect();
        assert_eq!(fields, vec!["title", "requirements", "resumes"]);
    }

    #[test]
    fn test_validation_checks_declared_levels() {
        let mut doc = CandidateDocument::new("ana.pdf", STRONG_CV);
        doc.declared = Some(DeclaredLevels::default());
        let err = pipeline(0.8).run(job(), vec![doc]).unwrap_err();

        let fields: Vec<&str> = err.issues.iter().map(FieldIssue::field).collect();
        assert_eq!(fields, vec!["candidates[1].education", "candidates[1].english"]);
    }

    #[test]
    fn test_document_issues_name_the_candidate() {
        assert_eq!(document_issues(&[]), vec![FieldIssue::missing("resumes")]);

        let mut partial = CandidateDocument::new("bia.pdf", STRONG_CV);
        partial.declared = Some(DeclaredLevels {
            education: Some("Ensino Superior".to_string()),
            english: Some("  ".to_string()),
            spanish: None,
        });
        let docs = vec![CandidateDocument::new("ana.pdf", STRONG_CV), partial];
        assert_eq!(
            document_issues(&docs),
            vec![FieldIssue::missing("candidates[2].english")]
        );
    }

    #[test]
    fn test_unknown_declared_label_skips_candidate() {
        let mut bad = CandidateDocument::new("bad.pdf", STRONG_CV);
        bad.declared = Some(DeclaredLevels {
            education: Some("graduação completa".to_string()),
            english: Some("fluente".to_string()),
            spanish: None,
        });
        let docs = vec![bad, CandidateDocument::new("ana.pdf", STRONG_CV)];
        let run = pipeline(0.8).run(job(), docs).unwrap();

        assert_eq!(run.results.len(), 1);
        assert_eq!(run.results[0].name, "ana.pdf");
        assert!(matches!(
            &run.warnings[0],
            RunWarning::CandidateFailed { candidate, .. } if candidate == "bad.pdf"
        ));
    }

    #[test]
    fn test_prediction_failure_uses_default_probability() {
        // Bypasses bundle validation to get a classifier that cannot predict.
        let bundle = ArtifactBundle {
            scaler: identity_scaler(),
            vectorizer: sample_vectorizer(),
            classifier: FitClassifier::Logistic {
                coef: vec![1.0; 3],
                intercept: 0.0,
            },
            stopwords: Stopwords::portuguese(),
            source: None,
        };
        let pipeline = RankingPipeline::new(Arc::new(bundle), ScoringPolicy::default());
        let run = pipeline
            .run(job(), vec![CandidateDocument::new("ana.pdf", STRONG_CV)])
            .unwrap();

        let r = &run.results[0];
        assert_eq!(r.probability, DEFAULT_PROBABILITY);
        assert!(r.prediction_degraded);
        assert!(matches!(
            &run.warnings[0],
            RunWarning::PredictionFallback { candidate, .. } if candidate == "ana.pdf"
        ));
    }

    #[test]
    fn test_preview_is_truncated() {
        let long = "python ".repeat(200);
        let run = pipeline(0.8)
            .run(job(), vec![CandidateDocument::new("ana.pdf", long)])
            .unwrap();

        let preview = &run.results[0].processed_text_preview;
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn test_identical_inputs_give_identical_results() {
        let p = pipeline(0.8);
        let a = p
            .run(job(), vec![CandidateDocument::new("ana.pdf", STRONG_CV)])
            .unwrap();
        let b = p
            .run(job(), vec![CandidateDocument::new("ana.pdf", STRONG_CV)])
            .unwrap();
        assert_eq!(a.results[0].score_combined, b.results[0].score_combined);
        assert_ne!(a.run_id, b.run_id);
    }
}

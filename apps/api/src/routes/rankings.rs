use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::artifacts::ArtifactBundle;
use crate::documents::UploadedDocument;
use crate::errors::AppError;
use crate::scoring::export::{export_csv, ExportTable};
use crate::scoring::levels::{
    scale_entries, AcademicLevel, LanguageLevel, ProfessionalLevel, ScaleEntry,
};
use crate::scoring::models::{
    CandidateDocument, FieldIssue, JobForm, JobRequisition, RankingRun, ValidationError,
};
use crate::scoring::pipeline::{document_issues, RankingPipeline};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ScalesResponse {
    pub academic: Vec<ScaleEntry>,
    pub language: Vec<ScaleEntry>,
    pub professional: Vec<ScaleEntry>,
}

#[derive(Deserialize)]
pub struct TextRankingRequest {
    #[serde(flatten)]
    pub job: JobForm,
    #[serde(default)]
    pub candidates: Vec<CandidateDocument>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub table: ExportTable,
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub status: &'static str,
    pub vocabulary_size: usize,
    pub stopword_count: usize,
}

/// GET /api/v1/scales
pub async fn handle_get_scales() -> Json<ScalesResponse> {
    Json(ScalesResponse {
        academic: scale_entries::<AcademicLevel>(),
        language: scale_entries::<LanguageLevel>(),
        professional: scale_entries::<ProfessionalLevel>(),
    })
}

/// POST /api/v1/rankings
/// Multipart form: job fields as text parts plus one `resumes` part per file.
pub async fn handle_create_ranking(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<RankingRun>, AppError> {
    let mut form = JobForm::default();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resumes" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("curriculo_{}", uploads.len() + 1));
                let content_type = field.content_type().map(str::to_string);
                let data: Bytes = field.bytes().await?;
                uploads.push(UploadedDocument {
                    file_name,
                    content_type,
                    data,
                });
            }
            "title" => form.title = Some(field.text().await?),
            "requirements" => form.requirements = Some(field.text().await?),
            "education" => form.education = Some(field.text().await?),
            "english" => form.english = Some(field.text().await?),
            "spanish" => form.spanish = Some(field.text().await?),
            "seniority" => form.seniority = Some(field.text().await?),
            other => {
                return Err(AppError::BadRequest(format!("unexpected form field '{other}'")));
            }
        }
    }

    let missing_resumes = if uploads.is_empty() {
        vec![FieldIssue::missing("resumes")]
    } else {
        Vec::new()
    };
    let job = requisition(form, missing_resumes)?;
    // Extraction is the slow part; don't start it without artifacts to score with.
    let artifacts = state.artifacts.get().await?;

    let mut documents = Vec::with_capacity(uploads.len());
    for upload in &uploads {
        let text = state.text_provider.extract_text(upload).await;
        documents.push(CandidateDocument::new(upload.file_name.clone(), text));
    }

    run_and_store(&state, artifacts, job, documents).await
}

/// POST /api/v1/rankings/text
/// Same as the multipart route, with résumé text supplied directly.
pub async fn handle_create_ranking_from_text(
    State(state): State<AppState>,
    Json(req): Json<TextRankingRequest>,
) -> Result<Json<RankingRun>, AppError> {
    let job = requisition(req.job, document_issues(&req.candidates))?;
    let artifacts = state.artifacts.get().await?;
    run_and_store(&state, artifacts, job, req.candidates).await
}

/// GET /api/v1/rankings/latest
pub async fn handle_get_latest(
    State(state): State<AppState>,
) -> Result<Json<RankingRun>, AppError> {
    let run = latest(&state).await?;
    Ok(Json(run.as_ref().clone()))
}

/// GET /api/v1/rankings/latest/export?table=summary|details
pub async fn handle_export_latest(
    State(state): State<AppState>,
    Query(params): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let run = latest(&state).await?;
    let csv = export_csv(&run, params.table)?;
    let disposition = format!("attachment; filename=\"{}\"", params.table.file_name());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// POST /api/v1/artifacts/reload
pub async fn handle_reload_artifacts(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, AppError> {
    let bundle = state.artifacts.reload().await?;
    info!("Artifacts reloaded from {}", state.artifacts.dir().display());
    Ok(Json(ReloadResponse {
        status: "reloaded",
        vocabulary_size: bundle.vectorizer.vocabulary.len(),
        stopword_count: bundle.stopwords.len(),
    }))
}

/// Maps the form. When it is rejected, the candidate-side issues are appended
/// so one response lists every problem.
fn requisition(
    form: JobForm,
    document_issues: Vec<FieldIssue>,
) -> Result<JobRequisition, ValidationError> {
    form.into_requisition().map_err(|mut e| {
        e.issues.extend(document_issues);
        e
    })
}

async fn latest(state: &AppState) -> Result<Arc<RankingRun>, AppError> {
    state
        .latest_run
        .read()
        .await
        .clone()
        .ok_or_else(|| AppError::NotFound("no ranking run has completed yet".to_string()))
}

async fn run_and_store(
    state: &AppState,
    artifacts: Arc<ArtifactBundle>,
    job: JobRequisition,
    documents: Vec<CandidateDocument>,
) -> Result<Json<RankingRun>, AppError> {
    let pipeline = RankingPipeline::new(artifacts, state.policy);

    // Scoring is CPU-bound; keep it off the async executor.
    let run = tokio::task::spawn_blocking(move || pipeline.run(job, documents))
        .await
        .map_err(|e| {
            AppError::Internal(anyhow::anyhow!("spawn_blocking failed in ranking run: {e}"))
        })??;

    let run = Arc::new(run);
    *state.latest_run.write().await = Some(Arc::clone(&run));
    Ok(Json(run.as_ref().clone()))
}

//! Axum route handlers for the Generation and Safety APIs.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::artifact::{ArtifactKind, GeneratedArtifact};
use crate::generation::orchestrator::cancel_pair;
use crate::generation::pipeline::GenerationRequest;
use crate::generation::store::StoredArtifact;
use crate::models::job::{GenerationOptions, JobPosting};
use crate::models::profile::CandidateProfile;
use crate::safety::bias::detect_bias;
use crate::safety::types::{BiasReport, SanitizationResult};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub profile: CandidateProfile,
    pub job: JobPosting,
    #[serde(default)]
    pub options: GenerationOptions,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub artifact_id: Uuid,
    pub artifact: GeneratedArtifact,
    pub sanitizer_warnings: Vec<String>,
    pub validation_warnings: Vec<String>,
    pub input_bias: BiasReport,
    pub artifact_bias: BiasReport,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/generate/cv
pub async fn handle_generate_cv(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateResponse>, AppError> {
    generate(state, ArtifactKind::TailoredCv, body).await
}

/// POST /api/v1/generate/cover-letter
pub async fn handle_generate_cover_letter(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateResponse>, AppError> {
    generate(state, ArtifactKind::CoverLetter, body).await
}

/// Runs the pipeline on its own task. If the client disconnects, this future
/// is dropped, the cancel handle with it, and the task stops at its next
/// suspension point instead of finishing orphaned provider calls.
async fn generate(
    state: AppState,
    kind: ArtifactKind,
    body: GenerateBody,
) -> Result<Json<GenerateResponse>, AppError> {
    if body.job.title.trim().is_empty() && body.job.description.trim().is_empty() {
        return Err(AppError::Validation(
            "job title or description is required".to_string(),
        ));
    }

    let request = GenerationRequest {
        kind,
        profile: body.profile,
        job: body.job,
        options: body.options,
        notes: body.notes,
    };

    let (_cancel_guard, cancel) = cancel_pair();
    let pipeline = state.pipeline.clone();
    let outcome = tokio::spawn(async move { pipeline.run(&request, &cancel).await })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Generation task failed: {e}")))?;

    let accepted = outcome.result.map_err(AppError::Rejected)?;
    let stored = state.store.save(accepted.artifact).await?;

    Ok(Json(GenerateResponse {
        artifact_id: stored.id,
        artifact: stored.artifact,
        sanitizer_warnings: accepted.sanitizer_warnings,
        validation_warnings: accepted.validation_warnings,
        input_bias: accepted.input_bias,
        artifact_bias: accepted.artifact_bias,
    }))
}

/// GET /api/v1/artifacts/:id
pub async fn handle_get_artifact(
    State(state): State<AppState>,
    Path(artifact_id): Path<Uuid>,
) -> Result<Json<StoredArtifact>, AppError> {
    let stored = state
        .store
        .get(artifact_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Artifact {artifact_id} not found")))?;

    Ok(Json(stored))
}

/// POST /api/v1/safety/sanitize
///
/// Previews the input sanitizer on arbitrary text.
pub async fn handle_sanitize(
    State(state): State<AppState>,
    Json(body): Json<TextBody>,
) -> Json<SanitizationResult> {
    Json(state.pipeline.sanitizer().sanitize(&body.text))
}

/// POST /api/v1/safety/bias
pub async fn handle_bias(Json(body): Json<TextBody>) -> Json<BiasReport> {
    Json(detect_bias(&body.text))
}

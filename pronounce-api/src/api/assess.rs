//! Assessment API handler
//!
//! POST /assess (multipart/form-data)
//!
//! | Field            | Required | Default   |
//! |------------------|----------|-----------|
//! | `audio`          | yes      |           |
//! | `text`           | yes      |           |
//! | `language`       | no       | `en-US`   |
//! | `enable_prosody` | no       | `false`   |
//! | `proficiency`    | no       | `General` |
//!
//! Unknown fields are ignored.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{AssessmentRequest, MergedReport, DEFAULT_LOCALE, DEFAULT_PROFICIENCY};
use crate::services::{assessment_workflow, AssessError};
use crate::AppState;

/// Lenient boolean form value; `None` for anything unrecognized
pub fn parse_form_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "f" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Collect the multipart form into an [`AssessmentRequest`]
///
/// Only structural problems are rejected here; text validation happens in
/// [`AssessmentRequest::validate`].
async fn read_form(mut multipart: Multipart) -> ApiResult<AssessmentRequest> {
    let mut audio = None;
    let mut file_name = None;
    let mut reference_text = String::new();
    let mut locale = None;
    let mut enable_prosody = false;
    let mut proficiency = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read audio part: {}", e))
                })?;
                audio = Some(bytes);
            }
            "text" | "language" | "enable_prosody" | "proficiency" => {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read field '{}': {}", name, e))
                })?;
                match name.as_str() {
                    "text" => reference_text = value,
                    "language" => locale = Some(value),
                    "enable_prosody" => {
                        enable_prosody = parse_form_bool(&value).ok_or_else(|| {
                            ApiError::BadRequest(format!(
                                "Invalid enable_prosody value: '{}'",
                                value
                            ))
                        })?;
                    }
                    _ => proficiency = Some(value),
                }
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown form field");
            }
        }
    }

    let audio = audio.ok_or_else(|| ApiError::BadRequest("Missing 'audio' file part.".to_string()))?;
    let locale = locale
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string());

    Ok(AssessmentRequest {
        reference_text,
        locale,
        audio,
        file_name,
        enable_prosody,
        proficiency: proficiency.unwrap_or_else(|| DEFAULT_PROFICIENCY.to_string()),
    })
}

/// POST /assess
///
/// Runs the Word, Syllable and Phoneme passes over the uploaded audio and
/// returns the merged report. The staged audio file is removed on every
/// exit path.
pub async fn assess(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<MergedReport>> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("assess", request_id = %request_id);

    handle_assessment(state, multipart).instrument(span).await
}

async fn handle_assessment(
    state: AppState,
    multipart: Multipart,
) -> ApiResult<Json<MergedReport>> {
    let request = read_form(multipart).await?;
    request.validate()?;

    // Before staging: an unconfigured service must not touch the disk
    if !state.assessor.is_configured() {
        tracing::error!("Speech service credentials missing, rejecting request");
        return Err(AssessError::NotConfigured.into());
    }

    tracing::info!(
        locale = %request.locale,
        audio_bytes = request.audio.len(),
        enable_prosody = request.enable_prosody,
        proficiency = %request.proficiency,
        "Assessment requested"
    );

    let staged = state
        .stager
        .stage(&request.audio, request.file_name.as_deref())
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to stage uploaded audio");
            ApiError::AudioStaging(e)
        })?;

    let outcome =
        assessment_workflow::run_assessment(state.assessor.as_ref(), staged.path(), &request)
            .await;

    let staged_path = staged.path().to_path_buf();
    if let Err(e) = staged.close() {
        tracing::warn!(
            path = %staged_path.display(),
            error = %e,
            "Failed to remove staged audio"
        );
    }

    let report = outcome?;
    tracing::info!(
        words = report.words.len(),
        combined = ?report.overall.combined.score,
        "Assessment complete"
    );
    Ok(Json(report))
}

/// Build assessment routes
pub fn assess_routes() -> Router<AppState> {
    Router::new().route("/assess", post(assess))
}

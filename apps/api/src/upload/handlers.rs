use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::auth::tokens::AuthUser;
use crate::credits::ledger::CreditBalance;
use crate::errors::AppError;
use crate::models::cv::Cv;
use crate::models::user::UsageField;
use crate::state::AppState;
use crate::upload::extract::extract_text;
use crate::upload::normalize::cv_from_parsed;
use crate::writing::assistant;
use crate::writing::handlers::run_paid_ai_action;

/// Upload size accepted by the import route.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub cv: Cv,
    pub credits: CreditBalance,
}

/// Pulls the `file` part out of the form.
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?;
        return Ok((filename, bytes.to_vec()));
    }
    Err(AppError::Validation("file is required".into()))
}

/// POST /api/v1/cv/import
/// Extracts text from an uploaded CV and returns it as a CV form draft.
pub async fn handle_import_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    auth.require_policies()?;
    let (filename, bytes) = read_file_field(&mut multipart).await?;

    let name = filename.clone();
    let raw_text = tokio::task::spawn_blocking(move || extract_text(&name, &bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}")))?
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    if raw_text.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "No readable text found in the file. Scanned or image-only documents are not supported"
                .into(),
        ));
    }

    let (parsed, credits) = run_paid_ai_action(
        &state,
        &auth.0,
        "cv_import",
        UsageField::UploadParses,
        || assistant::parse_cv(&state.llm, &raw_text),
    )
    .await?;

    let cv = cv_from_parsed(&parsed);
    info!(
        "Imported {filename} for user {}: {} experiences, {} education",
        auth.0.id,
        cv.experiences.len(),
        cv.education.len()
    );

    Ok(Json(ImportResponse { cv, credits }))
}

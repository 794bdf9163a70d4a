use std::future::Future;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::auth::tokens::AuthUser;
use crate::auth::users;
use crate::cooldown::{ai_action_key, AI_ACTION_COOLDOWN_SECS};
use crate::credits::ledger::{self, spend_source, CreditBalance, CreditCost};
use crate::errors::AppError;
use crate::llm_client::LlmError;
use crate::models::cv::Cv;
use crate::models::user::{UsageField, UserRow};
use crate::state::AppState;
use crate::writing::assistant::{self, JobHeader};
use crate::writing::safety::{validate_and_clean, SafetyVerdict};
use crate::writing::text::{enforce_word_limit, word_count, DOCUMENT_WORD_LIMIT, PANEL_WORD_LIMIT};

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub cv: Cv,
    #[serde(default)]
    pub instructions: String,
}

#[derive(Debug, Deserialize)]
pub struct SkillsRequest {
    #[serde(default)]
    pub skills: String,
}

#[derive(Debug, Deserialize)]
pub struct BulletsRequest {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct JobSummaryRequest {
    #[serde(default)]
    pub job_description: String,
}

#[derive(Debug, Deserialize)]
pub struct CoverLetterRequest {
    pub cv: Cv,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub job_summary: String,
}

#[derive(Debug, Serialize)]
pub struct AiTextResponse {
    pub text: String,
    pub warnings: Vec<String>,
    pub credits: CreditBalance,
}

#[derive(Debug, Serialize)]
pub struct CoverLetterResponse {
    pub body: String,
    pub greeting: String,
    pub header: JobHeader,
    pub warnings: Vec<String>,
    pub credits: CreditBalance,
}

// ────────────────────────────────────────────────────────────────────────────
// Input screening
// ────────────────────────────────────────────────────────────────────────────

/// Screens one free-text input and applies its word cap.
/// Illegal content rejects the whole request; anything else only adds warnings.
fn screen(
    label: &str,
    text: &str,
    max_words: usize,
    warnings: &mut Vec<String>,
) -> Result<String, AppError> {
    let text = match validate_and_clean(text) {
        SafetyVerdict::Use { text } => text,
        SafetyVerdict::Cleaned { text, warning } => {
            warnings.push(warning);
            text
        }
        SafetyVerdict::Illegal { warning } => return Err(AppError::UnprocessableEntity(warning)),
    };

    let (limited, truncated) = enforce_word_limit(&text, max_words);
    if truncated {
        warnings.push(format!(
            "{label} is limited to {max_words} words. Currently {}; extra words are ignored.",
            word_count(&text)
        ));
    }
    Ok(limited)
}

/// Screens the free-text parts of a CV before it is sent to the AI service.
fn screen_cv(cv: &Cv, warnings: &mut Vec<String>) -> Result<Cv, AppError> {
    let mut cv = cv.clone();
    if let Some(summary) = cv.summary.take() {
        cv.summary = Some(screen("Summary", &summary, DOCUMENT_WORD_LIMIT, warnings)?);
    }
    for exp in &mut cv.experiences {
        if let Some(description) = exp.description.take() {
            exp.description = Some(screen(
                "Role description",
                &description,
                DOCUMENT_WORD_LIMIT,
                warnings,
            )?);
        }
    }
    Ok(cv)
}

fn require_text(label: &str, text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        Err(AppError::Validation(format!("{label} is required")))
    } else {
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Charging
// ────────────────────────────────────────────────────────────────────────────

/// Runs one paid AI action: cooldown, spend one AI credit, call, refund on failure,
/// then bump the usage counter.
///
/// A refused spend frees the cooldown again. Once the call has succeeded the user
/// keeps the output: a failed counter update is only logged, and a failed balance
/// read refunds the credit before reporting the error.
pub(crate) async fn run_paid_ai_action<T, F, Fut>(
    state: &AppState,
    user: &UserRow,
    action: &str,
    usage: UsageField,
    call: F,
) -> Result<(T, CreditBalance), AppError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let cooldown_key = ai_action_key(user.id);
    if let Some(retry_after_secs) = state
        .cooldown
        .try_acquire(&cooldown_key, AI_ACTION_COOLDOWN_SECS)
        .await?
    {
        return Err(AppError::Cooldown { retry_after_secs });
    }

    let source = spend_source(action, user.id);
    if let Err(e) = ledger::spend_or_reject(&state.db, user.id, &source, CreditCost::ONE_AI).await {
        if let Err(release_err) = state.cooldown.release(&cooldown_key).await {
            warn!("Cooldown release for user {} failed: {release_err}", user.id);
        }
        return Err(e);
    }

    let output = match call().await {
        Ok(output) => output,
        Err(e) => {
            refund_or_log(state, user, &source).await;
            return Err(AppError::Llm(format!("{action} failed: {e}")));
        }
    };

    if let Err(e) = users::increment_usage(&state.db, user.id, usage).await {
        warn!("Usage counter update for {action} failed for user {}: {e}", user.id);
    }
    let credits = match ledger::balance(&state.db, user.id).await {
        Ok(credits) => credits,
        Err(e) => {
            refund_or_log(state, user, &source).await;
            return Err(e);
        }
    };
    info!("AI action {action} completed for user {}", user.id);
    Ok((output, credits))
}

async fn refund_or_log(state: &AppState, user: &UserRow, source: &str) {
    if let Err(refund_err) = ledger::refund(&state.db, user.id, source, CreditCost::ONE_AI).await {
        error!("Refund of {source} failed: {refund_err}");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/ai/summary
pub async fn handle_improve_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SummaryRequest>,
) -> Result<Json<AiTextResponse>, AppError> {
    auth.require_policies()?;
    let mut warnings = Vec::new();
    let instructions = screen("Instructions", &req.instructions, PANEL_WORD_LIMIT, &mut warnings)?;
    let cv = screen_cv(&req.cv, &mut warnings)?;

    let (text, credits) = run_paid_ai_action(
        &state,
        &auth.0,
        "ai_summary",
        UsageField::SummaryUses,
        || assistant::improve_summary(&state.llm, &cv, &instructions),
    )
    .await?;

    Ok(Json(AiTextResponse {
        text,
        warnings,
        credits,
    }))
}

/// POST /api/v1/ai/skills
pub async fn handle_improve_skills(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SkillsRequest>,
) -> Result<Json<AiTextResponse>, AppError> {
    auth.require_policies()?;
    require_text("Skills", &req.skills)?;
    let mut warnings = Vec::new();
    let skills = screen("Skills", &req.skills, PANEL_WORD_LIMIT, &mut warnings)?;

    // Skills share the summary counter.
    let (text, credits) = run_paid_ai_action(
        &state,
        &auth.0,
        "ai_skills",
        UsageField::SummaryUses,
        || assistant::improve_skills(&state.llm, &skills),
    )
    .await?;

    Ok(Json(AiTextResponse {
        text,
        warnings,
        credits,
    }))
}

/// POST /api/v1/ai/bullets
pub async fn handle_improve_bullets(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<BulletsRequest>,
) -> Result<Json<AiTextResponse>, AppError> {
    auth.require_policies()?;
    require_text("Description", &req.description)?;
    let mut warnings = Vec::new();
    let description = screen("Description", &req.description, PANEL_WORD_LIMIT, &mut warnings)?;

    let (text, credits) = run_paid_ai_action(
        &state,
        &auth.0,
        "ai_bullets",
        UsageField::BulletsUses,
        || assistant::improve_bullets(&state.llm, &description),
    )
    .await?;

    Ok(Json(AiTextResponse {
        text,
        warnings,
        credits,
    }))
}

/// POST /api/v1/ai/job-summary
pub async fn handle_job_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<JobSummaryRequest>,
) -> Result<Json<AiTextResponse>, AppError> {
    auth.require_policies()?;
    require_text("Job description", &req.job_description)?;
    let mut warnings = Vec::new();
    let job_description = screen(
        "Job description",
        &req.job_description,
        DOCUMENT_WORD_LIMIT,
        &mut warnings,
    )?;

    let (text, credits) = run_paid_ai_action(
        &state,
        &auth.0,
        "ai_job_summary",
        UsageField::JobSummaryUses,
        || assistant::job_summary(&state.llm, &job_description),
    )
    .await?;

    Ok(Json(AiTextResponse {
        text,
        warnings,
        credits,
    }))
}

/// POST /api/v1/ai/cover-letter
pub async fn handle_cover_letter(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CoverLetterRequest>,
) -> Result<Json<CoverLetterResponse>, AppError> {
    auth.require_policies()?;
    req.cv.validate()?;
    require_text("Job description", &req.job_description)?;

    let mut warnings = Vec::new();
    let job_description = screen(
        "Job description",
        &req.job_description,
        DOCUMENT_WORD_LIMIT,
        &mut warnings,
    )?;
    let job_summary = screen("Job summary", &req.job_summary, DOCUMENT_WORD_LIMIT, &mut warnings)?;
    let cv = screen_cv(&req.cv, &mut warnings)?;

    let (draft, credits) = run_paid_ai_action(
        &state,
        &auth.0,
        "ai_cover_letter",
        UsageField::CoverUses,
        || assistant::cover_letter(&state.llm, &cv, &job_description, &job_summary),
    )
    .await?;

    if draft.truncated {
        warnings.push("Cover letter was trimmed to 300 words.".to_string());
    }

    Ok(Json(CoverLetterResponse {
        greeting: draft.header.greeting(),
        body: draft.body,
        header: draft.header,
        warnings,
        credits,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cv::Experience;

    #[test]
    fn test_screen_rejects_illegal_content() {
        let mut warnings = Vec::new();
        let err = screen("Skills", "bomb making", 100, &mut warnings).unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }

    #[test]
    fn test_screen_cleans_and_limits() {
        let mut warnings = Vec::new();
        let out = screen("Instructions", "make it less stupid please now", 4, &mut warnings).unwrap();
        assert_eq!(out, "make it less unprofessional");
        assert_eq!(warnings.len(), 2);
        assert!(warnings[1].contains("limited to 4 words"));
    }

    #[test]
    fn test_screen_cv_cleans_role_descriptions() {
        let cv = Cv {
            full_name: "Jane".into(),
            email: "j@x.co".into(),
            experiences: vec![Experience {
                job_title: "Clerk".into(),
                description: Some("Handled shit customers".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut warnings = Vec::new();
        let screened = screen_cv(&cv, &mut warnings).unwrap();
        assert_eq!(
            screened.experiences[0].description.as_deref(),
            Some("Handled unprofessional wording customers")
        );
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_refused_spend_releases_cooldown() {
        // The lazy pool has no database behind it, so the spend fails.
        let state = crate::state::test_state();
        let user = crate::models::user::sample_user();
        let called = std::sync::atomic::AtomicBool::new(false);

        let result = run_paid_ai_action(&state, &user, "ai_summary", UsageField::SummaryUses, || async {
            called.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok::<_, LlmError>("text".to_string())
        })
        .await;

        assert!(result.is_err());
        assert!(!matches!(result, Err(AppError::Cooldown { .. })));
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(
            state
                .cooldown
                .try_acquire(&ai_action_key(user.id), AI_ACTION_COOLDOWN_SECS)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_held_cooldown_rejects_before_spending() {
        let state = crate::state::test_state();
        let user = crate::models::user::sample_user();
        state
            .cooldown
            .try_acquire(&ai_action_key(user.id), AI_ACTION_COOLDOWN_SECS)
            .await
            .unwrap();

        let result = run_paid_ai_action(&state, &user, "ai_summary", UsageField::SummaryUses, || async {
            Ok::<_, LlmError>("text".to_string())
        })
        .await;
        assert!(matches!(result, Err(AppError::Cooldown { retry_after_secs }) if retry_after_secs >= 1));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL DATABASE_URL"]
    async fn test_output_survives_failed_usage_counter(db: sqlx::PgPool) {
        let user = users::insert_user(&db, "counter@example.com", "", None).await.unwrap();
        ledger::grant(
            &db,
            user.id,
            &ledger::GrantSource::Starter(user.id),
            CreditCost::ONE_AI,
            None,
        )
        .await
        .unwrap();
        // Breaks the counter update only; the ledger tables are untouched.
        sqlx::query("ALTER TABLE users DROP COLUMN summary_uses")
            .execute(&db)
            .await
            .unwrap();

        let state = AppState {
            db,
            ..crate::state::test_state()
        };
        let (text, credits) =
            run_paid_ai_action(&state, &user, "ai_summary", UsageField::SummaryUses, || async {
                Ok::<_, LlmError>("Improved summary".to_string())
            })
            .await
            .unwrap();

        assert_eq!(text, "Improved summary");
        assert_eq!(credits, CreditBalance { cv: 0, ai: 0 });
    }

    #[test]
    fn test_require_text() {
        assert!(require_text("Skills", " ").is_err());
        assert!(require_text("Skills", "Rust").is_ok());
    }
}

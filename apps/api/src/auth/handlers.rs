use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::referral::{self, normalize_code};
use crate::auth::tokens::AuthUser;
use crate::auth::validation::{is_valid_email, normalize_email};
use crate::auth::{reset, users};
use crate::credits::ledger::{self, CreditBalance, GrantSource};
use crate::credits::plans::{REFERRAL_BONUS, REFERRAL_CAP, STARTER};
use crate::errors::AppError;
use crate::models::user::PublicUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    pub full_name: Option<String>,
    pub referral_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: PublicUser,
    pub credits: CreditBalance,
}

#[derive(Debug, Serialize)]
pub struct ReferralResponse {
    pub code: String,
    pub referrals_count: i32,
    pub cap: i32,
    pub bonus_cv: i32,
    pub bonus_ai: i32,
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    check_new_password(&req.password, &req.confirm_password)?;
    if req.email.trim().is_empty() {
        return Err(AppError::Validation("Please fill in all required fields".into()));
    }

    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation(
            "Please enter a valid email address (e.g. name@example.com)".into(),
        ));
    }

    let referral_code = req
        .referral_code
        .as_deref()
        .map(normalize_code)
        .filter(|c| !c.is_empty());
    if let Some(code) = &referral_code {
        if users::find_by_referral_code(&state.db, code).await?.is_none() {
            return Err(AppError::Validation("That referral code is not valid".into()));
        }
    }

    let full_name = req
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let user = users::insert_user(&state.db, &email, &hash_password(&req.password), full_name).await?;
    info!("Registered user {} (role {})", user.id, user.role);

    ledger::grant(&state.db, user.id, &GrantSource::Starter(user.id), STARTER, None).await?;

    if let Some(code) = &referral_code {
        // A failed bonus never blocks the signup.
        if let Err(e) = referral::apply_referral_bonus(&state.db, &user, code).await {
            warn!("Referral bonus for {} failed: {e}", user.id);
        }
    }

    let user = users::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found after registration".into()))?;
    let token = state.jwt.issue(user.id)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("Please enter both email and password".into()));
    }

    let user = users::find_by_email(&state.db, &normalize_email(&req.email))
        .await?
        .filter(|u| verify_password(&req.password, &u.password_hash))
        .filter(|u| !u.is_banned)
        .ok_or(AppError::Unauthorized)?;

    let token = state.jwt.issue(user.id)?;
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// POST /api/v1/auth/forgot-password
///
/// Always 202, whether or not the email belongs to an account.
pub async fn handle_forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<StatusCode, AppError> {
    if !req.email.trim().is_empty() {
        reset::start_reset(&state, &req.email).await?;
    }
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/v1/auth/reset-password
pub async fn handle_reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    check_new_password(&req.password, &req.confirm_password)?;
    reset::complete_reset(&state, &req.token, &req.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/me
pub async fn handle_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<MeResponse>, AppError> {
    let credits = ledger::balance(&state.db, user.id).await?;
    Ok(Json(MeResponse {
        user: user.into(),
        credits,
    }))
}

/// POST /api/v1/me/accept-policies
pub async fn handle_accept_policies(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = users::accept_policies(&state.db, user.id).await?;
    Ok(Json(user.into()))
}

/// GET /api/v1/me/referral
pub async fn handle_referral(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ReferralResponse>, AppError> {
    let code = referral::ensure_referral_code(&state.db, &user).await?;
    Ok(Json(ReferralResponse {
        code,
        referrals_count: user.referrals_count,
        cap: REFERRAL_CAP,
        bonus_cv: REFERRAL_BONUS.cv,
        bonus_ai: REFERRAL_BONUS.ai,
    }))
}

fn check_new_password(password: &str, confirm: &str) -> Result<(), AppError> {
    if password.is_empty() || confirm.is_empty() {
        return Err(AppError::Validation("Please fill in all required fields".into()));
    }
    if password != confirm {
        return Err(AppError::Validation("Passwords do not match".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_new_password() {
        assert!(check_new_password("abc", "abc").is_ok());
        assert!(matches!(
            check_new_password("abc", "abd"),
            Err(AppError::Validation(m)) if m.contains("do not match")
        ));
        assert!(matches!(
            check_new_password("", ""),
            Err(AppError::Validation(m)) if m.contains("required")
        ));
    }

    #[test]
    fn test_register_request_tolerates_missing_fields() {
        let req: RegisterRequest = serde_json::from_str(r#"{"email": "a@b.co"}"#).unwrap();
        assert!(req.password.is_empty());
        assert!(req.referral_code.is_none());
    }
}

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::admin::report::{compute_stats, users_csv, AdminStats};
use crate::auth::tokens::AuthUser;
use crate::auth::users;
use crate::auth::validation::normalize_email;
use crate::errors::AppError;
use crate::models::user::{Plan, PublicUser, Role, UserRow};
use crate::state::AppState;

/// At most this many accounts may hold the helper role.
pub const HELPER_CAP: i64 = 4;

#[derive(Debug, Serialize)]
pub struct AdminUsersResponse {
    pub stats: AdminStats,
    pub users: Vec<PublicUser>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub plan: Option<Plan>,
    pub role: Option<Role>,
    pub banned: Option<bool>,
}

async fn find_target(state: &AppState, email: &str) -> Result<UserRow, AppError> {
    let email = normalize_email(email);
    users::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {email} not found")))
}

/// Rules for a role change, given how many *other* users are helpers now.
pub fn check_role_change(
    actor: &UserRow,
    target: &UserRow,
    new_role: Role,
    other_helpers: i64,
) -> Result<(), AppError> {
    if new_role == Role::Owner && actor.role() != Role::Owner {
        return Err(AppError::Forbidden("Only the owner can assign the owner role".into()));
    }
    if new_role == Role::Helper && target.role() != Role::Helper && other_helpers >= HELPER_CAP {
        return Err(AppError::Conflict(format!(
            "You already have {HELPER_CAP} helpers. Remove one before adding another."
        )));
    }
    Ok(())
}

/// GET /api/v1/admin/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<AdminUsersResponse>, AppError> {
    auth.require_admin()?;
    let rows = users::list_all(&state.db).await?;
    let stats = compute_stats(&rows);
    Ok(Json(AdminUsersResponse {
        stats,
        users: rows.into_iter().map(PublicUser::from).collect(),
    }))
}

/// GET /api/v1/admin/users.csv
pub async fn handle_export_users_csv(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, AppError> {
    auth.require_admin()?;
    let rows = users::list_all(&state.db).await?;
    let csv = users_csv(&rows)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"users.csv\""),
        ],
        csv,
    )
        .into_response())
}

/// PATCH /api/v1/admin/users/:email
pub async fn handle_update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(email): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, AppError> {
    auth.require_admin()?;
    let target = find_target(&state, &email).await?;

    if let Some(role) = req.role {
        let helpers = users::count_with_role(&state.db, Role::Helper).await?;
        let other_helpers = if target.role() == Role::Helper {
            helpers - 1
        } else {
            helpers
        };
        check_role_change(&auth.0, &target, role, other_helpers)?;
        users::set_role(&state.db, target.id, role).await?;
        info!("Admin {} set role of {} to {}", auth.0.email, target.email, role.as_str());
    }
    if let Some(plan) = req.plan {
        users::set_plan(&state.db, target.id, plan).await?;
        info!("Admin {} set plan of {} to {}", auth.0.email, target.email, plan.as_str());
    }
    if let Some(banned) = req.banned {
        users::set_banned(&state.db, target.id, banned).await?;
        info!("Admin {} set banned={banned} for {}", auth.0.email, target.email);
    }

    let updated = users::find_by_id(&state.db, target.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", target.email)))?;
    Ok(Json(PublicUser::from(updated)))
}

/// DELETE /api/v1/admin/users/:email
/// Grants, spends and subscriptions go with the user.
pub async fn handle_delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(email): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;
    let target = find_target(&state, &email).await?;
    users::delete_by_id(&state.db, target.id).await?;
    info!("Admin {} deleted user {}", auth.0.email, target.email);
    Ok(StatusCode::NO_CONTENT)
}

use axum::{extract::State, Json};

use crate::auth::tokens::AuthUser;
use crate::credits::ledger::{self, CreditBalance};
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/credits
pub async fn handle_get_credits(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<CreditBalance>, AppError> {
    let balance = ledger::balance(&state.db, user.id).await?;
    Ok(Json(balance))
}

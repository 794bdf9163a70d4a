use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tracing::{error, info, warn};

use crate::auth::{password, users, validation::normalize_email};
use crate::errors::AppError;
use crate::state::AppState;

pub const RESET_TOKEN_EXPIRY_HOURS: i64 = 2;

/// 32 random bytes, hex encoded.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn is_reset_token_fresh(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match created_at {
        Some(created) => now - created <= Duration::hours(RESET_TOKEN_EXPIRY_HOURS),
        None => false,
    }
}

/// Stores a reset token for `email` and mails it. Unknown emails are a silent no-op
/// so the caller cannot probe which accounts exist.
pub async fn start_reset(state: &AppState, email: &str) -> Result<(), AppError> {
    let email = normalize_email(email);
    let Some(user) = users::find_by_email(&state.db, &email).await? else {
        info!("Password reset requested for unknown email");
        return Ok(());
    };

    let token = generate_reset_token();
    users::set_reset_token(&state.db, user.id, &token, Utc::now()).await?;

    match &state.email {
        Some(client) => {
            if let Err(e) = client.send_password_reset_email(&user.email, &token).await {
                error!("Failed to send password reset email to {}: {e}", user.email);
            }
        }
        None => warn!("Email is not configured; reset token stored for {}", user.id),
    }
    Ok(())
}

/// Sets a new password for the holder of a fresh reset token.
pub async fn complete_reset(
    state: &AppState,
    token: &str,
    new_password: &str,
) -> Result<(), AppError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Validation("Reset token is required".into()));
    }

    let user = users::find_by_reset_token(&state.db, token)
        .await?
        .filter(|u| is_reset_token_fresh(u.reset_token_created_at, Utc::now()))
        .ok_or_else(|| AppError::Validation("Reset token is invalid or has expired".into()))?;

    users::update_password(&state.db, user.id, &password::hash_password(new_password)).await?;
    info!("Password reset completed for user {}", user.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_token_shape() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert_ne!(token, generate_reset_token());
    }

    #[test]
    fn test_token_freshness_window() {
        let now = Utc::now();
        assert!(is_reset_token_fresh(Some(now - Duration::minutes(119)), now));
        assert!(is_reset_token_fresh(Some(now - Duration::hours(2)), now));
        assert!(!is_reset_token_fresh(Some(now - Duration::minutes(121)), now));
        assert!(!is_reset_token_fresh(None, now));
    }
}

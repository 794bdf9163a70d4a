use rand::{distributions::Alphanumeric, Rng};
use sqlx::PgPool;
use tracing::info;

use crate::credits::ledger::{self, GrantSource};
use crate::credits::plans::{REFERRAL_BONUS, REFERRAL_CAP};
use crate::errors::AppError;
use crate::models::user::UserRow;

const CODE_LEN: usize = 10;
const MAX_CODE_ATTEMPTS: usize = 5;

/// A random 10-character uppercase alphanumeric code.
pub fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Returns the user's referral code, assigning a fresh unique one on first use.
pub async fn ensure_referral_code(db: &PgPool, user: &UserRow) -> Result<String, AppError> {
    if let Some(code) = user.referral_code.as_deref().map(str::trim) {
        if !code.is_empty() {
            return Ok(code.to_uppercase());
        }
    }

    for _ in 0..MAX_CODE_ATTEMPTS {
        let candidate = generate_code();
        let result: Result<Option<Option<String>>, sqlx::Error> = sqlx::query_scalar(
            r#"
            UPDATE users SET referral_code = COALESCE(NULLIF(referral_code, ''), $1)
            WHERE id = $2
            RETURNING referral_code
            "#,
        )
        .bind(&candidate)
        .bind(user.id)
        .fetch_optional(db)
        .await;

        match result {
            Ok(Some(Some(code))) => return Ok(code.to_uppercase()),
            Ok(_) => break,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "could not assign a unique referral code to user {}",
        user.id
    )))
}

/// Whether a referrer with `referrals_count` completed referrals can still earn a bonus.
pub fn can_earn_bonus(referrals_count: i32) -> bool {
    referrals_count < REFERRAL_CAP
}

/// Pays the referrer when `referee` signed up with `code`. The referee gets nothing extra.
///
/// Returns whether a new bonus grant was created.
pub async fn apply_referral_bonus(
    db: &PgPool,
    referee: &UserRow,
    code: &str,
) -> Result<bool, AppError> {
    let code = normalize_code(code);
    if code.is_empty() {
        return Ok(false);
    }

    let Some(referrer) = crate::auth::users::find_by_referral_code(db, &code).await? else {
        return Ok(false);
    };
    if referrer.id == referee.id {
        return Ok(false);
    }

    sqlx::query("UPDATE users SET referred_by = COALESCE(referred_by, $1) WHERE id = $2")
        .bind(&code)
        .bind(referee.id)
        .execute(db)
        .await?;

    if !can_earn_bonus(referrer.referrals_count) {
        info!(
            "Referrer {} reached the referral cap, no bonus for {}",
            referrer.id, referee.id
        );
        return Ok(false);
    }

    let inserted = ledger::grant(
        db,
        referrer.id,
        &GrantSource::Referral {
            referee: referee.id,
        },
        REFERRAL_BONUS,
        None,
    )
    .await?;

    if inserted {
        sqlx::query("UPDATE users SET referrals_count = COALESCE(referrals_count, 0) + 1 WHERE id = $1")
            .bind(referrer.id)
            .execute(db)
            .await?;
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LEN);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  ab12cd "), "AB12CD");
    }

    #[test]
    fn test_referral_cap() {
        assert!(can_earn_bonus(0));
        assert!(can_earn_bonus(9));
        assert!(!can_earn_bonus(10));
        assert!(!can_earn_bonus(11));
    }
}

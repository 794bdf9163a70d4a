//! Credit ledger: balances are derived from grants minus spends, never stored.
//!
//! Grants carry a globally unique `source` so every grant is idempotent. Spends are
//! checked and written inside one transaction holding a row lock on the user.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;

/// Current spendable credits per unit. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CreditBalance {
    pub cv: i64,
    pub ai: i64,
}

impl CreditBalance {
    pub fn covers(&self, cost: CreditCost) -> bool {
        self.cv >= i64::from(cost.cv) && self.ai >= i64::from(cost.ai)
    }
}

/// An amount of credits, used both for prices and grant sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCost {
    pub cv: i32,
    pub ai: i32,
}

impl CreditCost {
    pub const ZERO: CreditCost = CreditCost { cv: 0, ai: 0 };
    pub const ONE_CV: CreditCost = CreditCost { cv: 1, ai: 0 };
    pub const ONE_AI: CreditCost = CreditCost { cv: 0, ai: 1 };

    pub fn is_zero(&self) -> bool {
        self.cv <= 0 && self.ai <= 0
    }
}

/// Why a grant exists. The rendered string is the grant's unique `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantSource {
    Starter(Uuid),
    Referral { referee: Uuid },
    StripeInvoice(String),
    Refund(String),
}

impl fmt::Display for GrantSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantSource::Starter(user) => write!(f, "starter_grant:{user}"),
            GrantSource::Referral { referee } => write!(f, "referral_bonus:{referee}"),
            GrantSource::StripeInvoice(invoice) => write!(f, "stripe_invoice:{invoice}"),
            GrantSource::Refund(spend_source) => write!(f, "refund:{spend_source}"),
        }
    }
}

/// A fresh, unique spend source such as `cv_download:<user>:<uuid>`.
pub fn spend_source(action: &str, user_id: Uuid) -> String {
    format!("{action}:{user_id}:{}", Uuid::new_v4())
}

const BALANCE_SQL: &str = r#"
    SELECT
        GREATEST(0,
            COALESCE((SELECT SUM(cv_amount) FROM credit_grants
                      WHERE user_id = $1 AND (expires_at IS NULL OR expires_at > NOW())), 0)
          - COALESCE((SELECT SUM(cv_amount) FROM credit_spends WHERE user_id = $1), 0)
        )::BIGINT AS cv,
        GREATEST(0,
            COALESCE((SELECT SUM(ai_amount) FROM credit_grants
                      WHERE user_id = $1 AND (expires_at IS NULL OR expires_at > NOW())), 0)
          - COALESCE((SELECT SUM(ai_amount) FROM credit_spends WHERE user_id = $1), 0)
        )::BIGINT AS ai
"#;

pub async fn balance(db: &PgPool, user_id: Uuid) -> Result<CreditBalance, AppError> {
    let (cv, ai): (i64, i64) = sqlx::query_as(BALANCE_SQL)
        .bind(user_id)
        .fetch_one(db)
        .await?;
    Ok(CreditBalance { cv, ai })
}

/// Inserts a grant unless one with the same source exists. Returns whether a row was added.
pub async fn grant(
    db: &PgPool,
    user_id: Uuid,
    source: &GrantSource,
    amount: CreditCost,
    expires_at: Option<DateTime<Utc>>,
) -> Result<bool, AppError> {
    let source = source.to_string();
    let result = sqlx::query(
        r#"
        INSERT INTO credit_grants (user_id, source, cv_amount, ai_amount, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (source) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(&source)
    .bind(amount.cv)
    .bind(amount.ai)
    .bind(expires_at)
    .execute(db)
    .await?;

    let inserted = result.rows_affected() > 0;
    if inserted {
        info!(
            "Credit grant {source}: +{} CV, +{} AI for user {user_id}",
            amount.cv, amount.ai
        );
    } else {
        debug!("Credit grant {source} already exists, skipped");
    }
    Ok(inserted)
}

/// Spends `cost` if the user can afford all of it. Returns `false` when refused.
pub async fn spend(
    db: &PgPool,
    user_id: Uuid,
    source: &str,
    cost: CreditCost,
) -> Result<bool, AppError> {
    if source.trim().is_empty() || cost.is_zero() {
        return Ok(false);
    }

    let mut tx = db.begin().await?;

    let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
    if locked.is_none() {
        tx.rollback().await?;
        return Ok(false);
    }

    let (cv, ai): (i64, i64) = sqlx::query_as(BALANCE_SQL)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    let current = CreditBalance { cv, ai };
    if !current.covers(cost) {
        tx.rollback().await?;
        debug!("Spend {source} refused for user {user_id}: balance cv={cv} ai={ai}");
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO credit_spends (user_id, source, cv_amount, ai_amount) VALUES ($1, $2, $3, $4)",
    )
    .bind(user_id)
    .bind(source)
    .bind(cost.cv.max(0))
    .bind(cost.ai.max(0))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

/// Returns a spend's credits after the paid action failed.
pub async fn refund(
    db: &PgPool,
    user_id: Uuid,
    spend_source: &str,
    cost: CreditCost,
) -> Result<bool, AppError> {
    grant(
        db,
        user_id,
        &GrantSource::Refund(spend_source.to_string()),
        cost,
        None,
    )
    .await
}

/// Spends `cost` or fails with `InsufficientCredits`, naming the unit that ran out.
pub async fn spend_or_reject(
    db: &PgPool,
    user_id: Uuid,
    source: &str,
    cost: CreditCost,
) -> Result<(), AppError> {
    if spend(db, user_id, source, cost).await? {
        Ok(())
    } else {
        Err(AppError::InsufficientCredits(shortfall_message(cost)))
    }
}

fn shortfall_message(cost: CreditCost) -> String {
    if cost.cv > 0 {
        "You have no CV credits left. Upgrade your plan to download more CVs.".to_string()
    } else {
        "You have no AI credits left. Upgrade your plan to use more AI features.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers() {
        let bal = CreditBalance { cv: 1, ai: 0 };
        assert!(bal.covers(CreditCost::ONE_CV));
        assert!(!bal.covers(CreditCost::ONE_AI));
        assert!(!bal.covers(CreditCost { cv: 1, ai: 1 }));
        assert!(bal.covers(CreditCost::ZERO));
    }

    #[test]
    fn test_grant_source_strings() {
        let id = Uuid::nil();
        assert_eq!(
            GrantSource::Starter(id).to_string(),
            "starter_grant:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            GrantSource::Referral { referee: id }.to_string(),
            "referral_bonus:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            GrantSource::StripeInvoice("in_123".into()).to_string(),
            "stripe_invoice:in_123"
        );
        assert_eq!(
            GrantSource::Refund("cv_download:x:y".into()).to_string(),
            "refund:cv_download:x:y"
        );
    }

    #[test]
    fn test_spend_sources_are_unique() {
        let id = Uuid::new_v4();
        let a = spend_source("ai_summary", id);
        let b = spend_source("ai_summary", id);
        assert_ne!(a, b);
        assert!(a.starts_with(&format!("ai_summary:{id}:")));
    }

    #[test]
    fn test_shortfall_message_names_unit() {
        assert!(shortfall_message(CreditCost::ONE_CV).contains("CV credits"));
        assert!(shortfall_message(CreditCost::ONE_AI).contains("AI credits"));
    }

    #[tokio::test]
    async fn test_spend_refuses_blank_source_and_zero_cost() {
        let db = crate::state::test_state().db;
        let user = Uuid::new_v4();
        assert!(!spend(&db, user, "", CreditCost::ONE_AI).await.unwrap());
        assert!(!spend(&db, user, "   ", CreditCost::ONE_CV).await.unwrap());
        assert!(!spend(&db, user, "ai_summary:x", CreditCost::ZERO).await.unwrap());
    }

    // Database-backed ledger rules. Run with DATABASE_URL set and `cargo test -- --ignored`.

    async fn insert_user(db: &PgPool, email: &str) -> Uuid {
        sqlx::query_scalar("INSERT INTO users (email) VALUES ($1) RETURNING id")
            .bind(email)
            .fetch_one(db)
            .await
            .unwrap()
    }

    async fn insert_spend(db: &PgPool, user_id: Uuid, cv: i32, ai: i32) {
        sqlx::query(
            "INSERT INTO credit_spends (user_id, source, cv_amount, ai_amount) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(spend_source("seed", user_id))
        .bind(cv)
        .bind(ai)
        .execute(db)
        .await
        .unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL DATABASE_URL"]
    async fn test_expired_grants_are_excluded(db: PgPool) {
        let user = insert_user(&db, "expiry@example.com").await;
        let past = Utc::now() - chrono::Duration::days(1);
        let future = Utc::now() + chrono::Duration::days(30);
        grant(&db, user, &GrantSource::StripeInvoice("in_old".into()), CreditCost { cv: 10, ai: 10 }, Some(past))
            .await
            .unwrap();
        grant(&db, user, &GrantSource::StripeInvoice("in_new".into()), CreditCost { cv: 2, ai: 3 }, Some(future))
            .await
            .unwrap();
        grant(&db, user, &GrantSource::Starter(user), CreditCost { cv: 1, ai: 1 }, None)
            .await
            .unwrap();

        assert_eq!(balance(&db, user).await.unwrap(), CreditBalance { cv: 3, ai: 4 });
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL DATABASE_URL"]
    async fn test_balance_is_floored_at_zero(db: PgPool) {
        let user = insert_user(&db, "floor@example.com").await;
        grant(&db, user, &GrantSource::Starter(user), CreditCost { cv: 1, ai: 1 }, None)
            .await
            .unwrap();
        insert_spend(&db, user, 4, 2).await;

        assert_eq!(balance(&db, user).await.unwrap(), CreditBalance { cv: 0, ai: 0 });
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL DATABASE_URL"]
    async fn test_grant_is_idempotent_on_source(db: PgPool) {
        let user = insert_user(&db, "idem@example.com").await;
        let source = GrantSource::StripeInvoice("in_123".into());
        let amount = CreditCost { cv: 20, ai: 30 };

        assert!(grant(&db, user, &source, amount, None).await.unwrap());
        assert!(!grant(&db, user, &source, amount, None).await.unwrap());
        assert_eq!(balance(&db, user).await.unwrap(), CreditBalance { cv: 20, ai: 30 });
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL DATABASE_URL"]
    async fn test_spend_refuses_when_any_unit_is_short(db: PgPool) {
        let user = insert_user(&db, "short@example.com").await;
        grant(&db, user, &GrantSource::Starter(user), CreditCost { cv: 1, ai: 0 }, None)
            .await
            .unwrap();

        assert!(!spend(&db, user, "both", CreditCost { cv: 1, ai: 1 }).await.unwrap());
        assert!(!spend(&db, user, "ai_only", CreditCost::ONE_AI).await.unwrap());
        assert_eq!(balance(&db, user).await.unwrap(), CreditBalance { cv: 1, ai: 0 });

        assert!(spend(&db, user, "cv_download", CreditCost::ONE_CV).await.unwrap());
        assert_eq!(balance(&db, user).await.unwrap(), CreditBalance { cv: 0, ai: 0 });
        assert!(!spend(&db, user, "cv_again", CreditCost::ONE_CV).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL DATABASE_URL"]
    async fn test_refund_restores_spent_credits(db: PgPool) {
        let user = insert_user(&db, "refund@example.com").await;
        grant(&db, user, &GrantSource::Starter(user), CreditCost::ONE_AI, None)
            .await
            .unwrap();
        let source = spend_source("ai_summary", user);
        spend_or_reject(&db, user, &source, CreditCost::ONE_AI).await.unwrap();
        assert_eq!(balance(&db, user).await.unwrap().ai, 0);

        assert!(refund(&db, user, &source, CreditCost::ONE_AI).await.unwrap());
        assert!(!refund(&db, user, &source, CreditCost::ONE_AI).await.unwrap());
        assert_eq!(balance(&db, user).await.unwrap().ai, 1);
    }
}

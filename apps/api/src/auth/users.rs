use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{Plan, Role, UsageField, UserRow};

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<UserRow>, AppError> {
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

/// Lookup by an already-normalized email.
pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<UserRow>, AppError> {
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn find_by_referral_code(db: &PgPool, code: &str) -> Result<Option<UserRow>, AppError> {
    let user = sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users WHERE UPPER(referral_code) = UPPER($1) LIMIT 1",
    )
    .bind(code.trim())
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Inserts a user. The very first account becomes the owner with admin rights.
///
/// Returns `Conflict` when the email is already taken.
pub async fn insert_user(
    db: &PgPool,
    email: &str,
    password_hash: &str,
    full_name: Option<&str>,
) -> Result<UserRow, AppError> {
    let result = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (email, password_hash, full_name, plan, role, is_admin)
        SELECT $1, $2, $3, 'free',
               CASE WHEN EXISTS (SELECT 1 FROM users) THEN 'user' ELSE 'owner' END,
               NOT EXISTS (SELECT 1 FROM users)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .fetch_one(db)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
            "An account with this email already exists".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Returns the user for `email`, creating a password-less free account if needed.
/// Accounts created here are always plain users, even in an empty database.
pub async fn get_or_create_by_email(db: &PgPool, email: &str) -> Result<UserRow, AppError> {
    if let Some(user) = find_by_email(db, email).await? {
        return Ok(user);
    }
    let inserted = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (email, password_hash, plan, role, is_admin)
        VALUES ($1, '', 'free', 'user', FALSE)
        ON CONFLICT (email) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;

    match inserted {
        Some(user) => Ok(user),
        // Lost a race with a concurrent insert.
        None => find_by_email(db, email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {email} not found"))),
    }
}

pub async fn list_all(db: &PgPool) -> Result<Vec<UserRow>, AppError> {
    let users = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(db)
        .await?;
    Ok(users)
}

pub async fn increment_usage(db: &PgPool, user_id: Uuid, field: UsageField) -> Result<(), AppError> {
    let column = field.column();
    sqlx::query(&format!(
        "UPDATE users SET {column} = COALESCE({column}, 0) + 1 WHERE id = $1"
    ))
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn set_plan(db: &PgPool, user_id: Uuid, plan: Plan) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET plan = $1 WHERE id = $2")
        .bind(plan.as_str())
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn set_role(db: &PgPool, user_id: Uuid, role: Role) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
        .bind(role.as_str())
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn set_banned(db: &PgPool, user_id: Uuid, banned: bool) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET is_banned = $1 WHERE id = $2")
        .bind(banned)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn count_with_role(db: &PgPool, role: Role) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
        .bind(role.as_str())
        .fetch_one(db)
        .await?;
    Ok(count)
}

/// Grants and spends go with the user through `ON DELETE CASCADE`.
pub async fn delete_by_id(db: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Sets `accepted_policies` and keeps the first acceptance time.
pub async fn accept_policies(db: &PgPool, user_id: Uuid) -> Result<UserRow, AppError> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users
        SET accepted_policies = TRUE,
            accepted_policies_at = COALESCE(accepted_policies_at, NOW())
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(user)
}

pub async fn set_reset_token(
    db: &PgPool,
    user_id: Uuid,
    token: &str,
    created_at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET reset_token = $1, reset_token_created_at = $2 WHERE id = $3")
        .bind(token)
        .bind(created_at)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn find_by_reset_token(db: &PgPool, token: &str) -> Result<Option<UserRow>, AppError> {
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE reset_token = $1 LIMIT 1")
        .bind(token)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

/// Stores a new password hash and clears any outstanding reset token.
pub async fn update_password(db: &PgPool, user_id: Uuid, password_hash: &str) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE users
        SET password_hash = $1, reset_token = NULL, reset_token_created_at = NULL
        WHERE id = $2
        "#,
    )
    .bind(password_hash)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL DATABASE_URL"]
    async fn test_first_registered_user_is_owner(db: PgPool) {
        let first = insert_user(&db, "first@example.com", "hash", None).await.unwrap();
        let second = insert_user(&db, "second@example.com", "hash", None).await.unwrap();
        assert_eq!(first.role(), Role::Owner);
        assert!(first.is_admin);
        assert_eq!(second.role(), Role::User);
        assert!(!second.is_admin);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL DATABASE_URL"]
    async fn test_account_created_by_email_is_never_owner(db: PgPool) {
        let created = get_or_create_by_email(&db, "payer@example.com").await.unwrap();
        assert_eq!(created.role(), Role::User);
        assert!(!created.is_admin);
        assert!(created.password_hash.is_empty());

        let again = get_or_create_by_email(&db, "payer@example.com").await.unwrap();
        assert_eq!(again.id, created.id);
    }
}

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates a PostgreSQL connection pool and applies pending migrations.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&normalize_database_url(database_url))
        .await?;

    info!("PostgreSQL connection pool established");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied");

    Ok(pool)
}

/// Hosting providers still hand out `postgres://` URLs; both schemes are accepted.
fn normalize_database_url(url: &str) -> String {
    let url = url.trim();
    match url.strip_prefix("postgres://") {
        Some(rest) => format!("postgresql://{rest}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_scheme_is_rewritten() {
        assert_eq!(
            normalize_database_url("postgres://u:p@host/db"),
            "postgresql://u:p@host/db"
        );
    }

    #[test]
    fn test_postgresql_scheme_is_untouched() {
        assert_eq!(
            normalize_database_url(" postgresql://u@host/db "),
            "postgresql://u@host/db"
        );
    }
}

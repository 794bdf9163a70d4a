use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::tokens::JwtKeys;
use crate::billing::stripe::StripeClient;
use crate::config::Config;
use crate::cooldown::CooldownGate;
use crate::jobs::adzuna::AdzunaClient;
use crate::jobs::cache::SearchCache;
use crate::llm_client::LlmClient;
use crate::notify::email::EmailClient;
use crate::render::PdfRenderer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    pub jwt: JwtKeys,
    pub config: Config,
    /// Per-user AI action lock. Redis-backed in production.
    pub cooldown: Arc<dyn CooldownGate>,
    pub search_cache: Arc<dyn SearchCache>,
    pub pdf: Arc<dyn PdfRenderer>,
    // Optional integrations: `None` answers 503 FEATURE_NOT_CONFIGURED.
    pub stripe: Option<StripeClient>,
    pub adzuna: Option<AdzunaClient>,
    pub email: Option<EmailClient>,
}

/// State for router tests. The pool connects lazily, so routes that never touch
/// the database run without one.
#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use crate::cooldown::InMemoryCooldown;
    use crate::jobs::cache::InMemorySearchCache;
    use crate::render::ChromiumPdfRenderer;

    let config = Config::for_tests();
    let db = sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy(&config.database_url)
        .unwrap();
    let stripe = config
        .stripe
        .clone()
        .map(|c| StripeClient::new(c).unwrap());
    AppState {
        db,
        llm: LlmClient::with_base_url("test-key".into(), "http://127.0.0.1:9").unwrap(),
        jwt: JwtKeys::from_secret(&config.jwt_secret),
        cooldown: Arc::new(InMemoryCooldown::default()),
        search_cache: Arc::new(InMemorySearchCache::default()),
        pdf: Arc::new(ChromiumPdfRenderer::new(config.chromium_path.clone())),
        stripe,
        adzuna: None,
        email: None,
        config,
    }
}

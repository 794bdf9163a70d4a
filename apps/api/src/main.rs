mod admin;
mod auth;
mod billing;
mod config;
mod cooldown;
mod credits;
mod db;
mod errors;
mod jobs;
mod legal;
mod llm_client;
mod models;
mod notify;
mod render;
mod routes;
mod state;
mod upload;
mod writing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::tokens::JwtKeys;
use crate::billing::stripe::StripeClient;
use crate::config::Config;
use crate::cooldown::RedisCooldown;
use crate::db::create_pool;
use crate::jobs::adzuna::AdzunaClient;
use crate::jobs::cache::RedisSearchCache;
use crate::llm_client::LlmClient;
use crate::notify::email::EmailClient;
use crate::render::ChromiumPdfRenderer;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Career API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    // Cooldowns and cached job searches share one multiplexed connection
    let redis = redis::Client::open(config.redis_url.clone())?;
    let redis_conn = redis.get_multiplexed_async_connection().await?;
    info!("Redis connection established");

    let llm = LlmClient::new(config.openai_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let stripe = match config.stripe.clone() {
        Some(stripe_config) => Some(StripeClient::new(stripe_config)?),
        None => {
            info!("STRIPE_SECRET_KEY not set, billing disabled");
            None
        }
    };
    let adzuna = match &config.adzuna {
        Some(adzuna_config) => Some(AdzunaClient::new(adzuna_config)?),
        None => {
            info!("ADZUNA_APP_ID not set, job search disabled");
            None
        }
    };
    let email = match &config.email {
        Some(email_config) => Some(EmailClient::new(email_config, config.app_url.clone())?),
        None => {
            info!("RESEND_API_KEY not set, emails will be skipped");
            None
        }
    };

    let state = AppState {
        db,
        llm,
        jwt: JwtKeys::from_secret(&config.jwt_secret),
        cooldown: Arc::new(RedisCooldown::new(redis_conn.clone())),
        search_cache: Arc::new(RedisSearchCache::new(redis_conn)),
        pdf: Arc::new(ChromiumPdfRenderer::new(config.chromium_path.clone())),
        stripe,
        adzuna,
        email,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

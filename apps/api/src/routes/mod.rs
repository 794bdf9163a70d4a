pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::state::AppState;
use crate::{admin, auth, billing, credits, jobs, legal, render, upload, writing};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Accounts
        .route("/api/v1/auth/register", post(auth::handlers::handle_register))
        .route("/api/v1/auth/login", post(auth::handlers::handle_login))
        .route(
            "/api/v1/auth/forgot-password",
            post(auth::handlers::handle_forgot_password),
        )
        .route(
            "/api/v1/auth/reset-password",
            post(auth::handlers::handle_reset_password),
        )
        .route("/api/v1/me", get(auth::handlers::handle_me))
        .route(
            "/api/v1/me/accept-policies",
            post(auth::handlers::handle_accept_policies),
        )
        .route("/api/v1/me/referral", get(auth::handlers::handle_referral))
        .route("/api/v1/credits", get(credits::handlers::handle_get_credits))
        // AI writing assistant
        .route("/api/v1/ai/summary", post(writing::handlers::handle_improve_summary))
        .route("/api/v1/ai/skills", post(writing::handlers::handle_improve_skills))
        .route("/api/v1/ai/bullets", post(writing::handlers::handle_improve_bullets))
        .route("/api/v1/ai/job-summary", post(writing::handlers::handle_job_summary))
        .route(
            "/api/v1/ai/cover-letter",
            post(writing::handlers::handle_cover_letter),
        )
        // CV import
        .route(
            "/api/v1/cv/import",
            post(upload::handlers::handle_import_cv)
                .layer(DefaultBodyLimit::max(upload::handlers::MAX_UPLOAD_BYTES)),
        )
        // Documents
        .route("/api/v1/documents/cv", post(render::handlers::handle_render_cv))
        .route(
            "/api/v1/documents/cover-letter",
            post(render::handlers::handle_render_cover_letter),
        )
        // Job search
        .route("/api/v1/jobs/search", get(jobs::handlers::handle_search_jobs))
        // Billing
        .route(
            "/api/v1/billing/checkout",
            post(billing::handlers::handle_create_checkout),
        )
        .route("/stripe/webhook", post(billing::handlers::handle_stripe_webhook))
        // Admin
        .route("/api/v1/admin/users", get(admin::handlers::handle_list_users))
        .route(
            "/api/v1/admin/users.csv",
            get(admin::handlers::handle_export_users_csv),
        )
        .route(
            "/api/v1/admin/users/:email",
            patch(admin::handlers::handle_update_user).delete(admin::handlers::handle_delete_user),
        )
        // Legal
        .route("/api/v1/legal", get(legal::handlers::handle_list_policies))
        .route("/api/v1/legal/:slug", get(legal::handlers::handle_get_policy))
        .route("/legal/:slug", get(legal::handlers::handle_get_policy_markdown))
        .with_state(state)
}

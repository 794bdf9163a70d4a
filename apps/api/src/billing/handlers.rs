use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::tokens::AuthUser;
use crate::auth::users;
use crate::billing::events::{InvoiceDetails, StripeEvent};
use crate::billing::stripe::{StripeClient, SubscriptionInfo};
use crate::billing::webhook::WebhookVerifier;
use crate::credits::ledger::{self, GrantSource};
use crate::credits::plans::{credits_for_plan, plan_from_price, price_for_plan};
use crate::errors::AppError;
use crate::models::user::Plan;
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub plan: Plan,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub id: String,
    pub url: String,
}

/// POST /api/v1/billing/checkout
/// Starts a Stripe Checkout for the monthly or pro subscription.
pub async fn handle_create_checkout(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    auth.require_policies()?;
    let stripe = state.stripe.as_ref().ok_or(AppError::NotConfigured("Billing"))?;
    let app_url = state
        .config
        .app_url
        .as_deref()
        .ok_or(AppError::NotConfigured("APP_URL"))?;

    let price_id = price_for_plan(req.plan, stripe.config()).ok_or_else(|| {
        AppError::Validation("plan must be \"monthly\" or \"pro\"".into())
    })?;

    let session = stripe
        .create_checkout_session(
            price_id,
            &auth.0.email,
            &format!("{app_url}/?checkout=success"),
            &format!("{app_url}/?checkout=cancelled"),
            req.plan.as_str(),
        )
        .await
        .map_err(|e| AppError::Upstream(format!("Stripe checkout failed: {e}")))?;

    let url = session
        .url
        .ok_or_else(|| AppError::Upstream("Stripe returned a session without a URL".into()))?;
    info!("Checkout session {} created for user {}", session.id, auth.0.id);
    Ok(Json(CheckoutResponse {
        id: session.id,
        url,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Webhook
// ────────────────────────────────────────────────────────────────────────────

/// What the webhook did with an event. Every variant answers 200.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Duplicate,
    Ignored(&'static str),
    Granted {
        user_id: Uuid,
        plan: Plan,
        inserted: bool,
    },
    NotHandled,
}

impl WebhookOutcome {
    pub fn to_json(&self) -> Value {
        match self {
            WebhookOutcome::Duplicate => json!({"status": "duplicate_ignored"}),
            WebhookOutcome::Ignored(reason) => json!({"status": "ignored", "reason": reason}),
            WebhookOutcome::Granted {
                user_id,
                plan,
                inserted,
            } => json!({
                "status": "ok",
                "granted": inserted,
                "user_id": user_id,
                "plan": plan.as_str(),
            }),
            WebhookOutcome::NotHandled => json!({"status": "ok", "note": "event_not_handled"}),
        }
    }
}

/// Subscription credits expire with the billing period unless stacking is on.
pub fn grant_expiry(period_end: Option<i64>, credit_stacking: bool) -> Option<DateTime<Utc>> {
    if credit_stacking {
        None
    } else {
        period_end.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Records the event id. Returns `false` when it was already processed.
async fn mark_event_processed(db: &PgPool, event_id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("INSERT INTO stripe_events (event_id) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(event_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn upsert_subscription(
    db: &PgPool,
    user_id: Uuid,
    customer_id: &str,
    subscription_id: &str,
    plan: Plan,
    sub: &SubscriptionInfo,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO subscriptions
            (user_id, stripe_customer_id, stripe_subscription_id, plan, status,
             current_period_end, cancel_at_period_end)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (stripe_subscription_id) DO UPDATE SET
            user_id = EXCLUDED.user_id,
            stripe_customer_id = EXCLUDED.stripe_customer_id,
            plan = EXCLUDED.plan,
            status = EXCLUDED.status,
            current_period_end = EXCLUDED.current_period_end,
            cancel_at_period_end = EXCLUDED.cancel_at_period_end,
            updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(customer_id)
    .bind(subscription_id)
    .bind(plan.as_str())
    .bind(&sub.status)
    .bind(sub.current_period_end.and_then(|secs| DateTime::from_timestamp(secs, 0)))
    .bind(sub.cancel_at_period_end)
    .execute(db)
    .await?;
    Ok(())
}

/// Grants the plan allowance for one paid invoice.
async fn process_invoice_paid(
    state: &AppState,
    stripe: &StripeClient,
    invoice: &Value,
) -> Result<WebhookOutcome, AppError> {
    let details = InvoiceDetails::from_object(invoice);

    let Some(plan) = details
        .price_id
        .as_deref()
        .and_then(|price| plan_from_price(price, stripe.config()))
    else {
        warn!(
            "Invoice {} ignored: unknown price {:?}",
            details.invoice_id, details.price_id
        );
        return Ok(WebhookOutcome::Ignored("unknown_price"));
    };

    let email = match (&details.customer_email, &details.customer_id) {
        (Some(email), _) => Some(email.clone()),
        (None, Some(customer_id)) => stripe
            .retrieve_customer_email(customer_id)
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe customer lookup failed: {e}")))?,
        (None, None) => None,
    };
    let Some(email) = email else {
        warn!("Invoice {} ignored: no customer email", details.invoice_id);
        return Ok(WebhookOutcome::Ignored("no_customer_email"));
    };

    let user = users::get_or_create_by_email(&state.db, &email).await?;

    let mut period_end = None;
    if let Some(subscription_id) = &details.subscription_id {
        let sub = stripe
            .retrieve_subscription(subscription_id)
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe subscription lookup failed: {e}")))?;
        period_end = sub.current_period_end;
        upsert_subscription(
            &state.db,
            user.id,
            details.customer_id.as_deref().unwrap_or_default(),
            subscription_id,
            plan,
            &sub,
        )
        .await?;
    }

    users::set_plan(&state.db, user.id, plan).await?;

    let inserted = ledger::grant(
        &state.db,
        user.id,
        &GrantSource::StripeInvoice(details.invoice_id.clone()),
        credits_for_plan(plan),
        grant_expiry(period_end, state.config.credit_stacking),
    )
    .await?;

    info!(
        "Invoice {} paid: user {} on plan {} (grant inserted: {inserted})",
        details.invoice_id,
        user.id,
        plan.as_str()
    );
    Ok(WebhookOutcome::Granted {
        user_id: user.id,
        plan,
        inserted,
    })
}

async fn process_event(
    state: &AppState,
    stripe: &StripeClient,
    event: &StripeEvent,
) -> Result<WebhookOutcome, AppError> {
    if !event.id.is_empty() && !mark_event_processed(&state.db, &event.id).await? {
        info!("Duplicate Stripe event {} ({}) ignored", event.id, event.event_type);
        return Ok(WebhookOutcome::Duplicate);
    }

    if event.is_invoice_paid() {
        process_invoice_paid(state, stripe, &event.data.object).await
    } else {
        Ok(WebhookOutcome::NotHandled)
    }
}

/// POST /stripe/webhook
/// Bad signatures get 400. Everything after verification answers 200 so Stripe
/// does not keep retrying; failures are logged and reported as `status: "error"`.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let stripe = state.stripe.as_ref().ok_or(AppError::NotConfigured("Billing"))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let verifier = WebhookVerifier::new(stripe.config().webhook_secret.as_str());
    if let Err(e) = verifier.verify(&body, signature, Utc::now().timestamp()) {
        warn!("Stripe webhook rejected: {e}");
        return Ok((StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))));
    }

    let event: StripeEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Stripe webhook payload unreadable: {e}");
            return Ok((StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))));
        }
    };

    let body = match process_event(&state, stripe, &event).await {
        Ok(outcome) => outcome.to_json(),
        Err(e) => {
            error!("Stripe event {} ({}) failed: {e}", event.id, event.event_type);
            json!({"status": "error"})
        }
    };
    Ok((StatusCode::OK, Json(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::webhook::sign_for_test;
    use crate::state::test_state;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[test]
    fn test_grant_expiry() {
        assert_eq!(grant_expiry(Some(1_700_000_000), true), None);
        assert_eq!(grant_expiry(None, false), None);
        assert_eq!(
            grant_expiry(Some(1_700_000_000), false).map(|d| d.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn test_outcome_json() {
        assert_eq!(WebhookOutcome::Duplicate.to_json()["status"], "duplicate_ignored");
        let ignored = WebhookOutcome::Ignored("unknown_price").to_json();
        assert_eq!(ignored["status"], "ignored");
        assert_eq!(ignored["reason"], "unknown_price");
        let granted = WebhookOutcome::Granted {
            user_id: Uuid::nil(),
            plan: Plan::Pro,
            inserted: true,
        }
        .to_json();
        assert_eq!(granted["plan"], "pro");
        assert_eq!(granted["granted"], true);
    }

    #[test]
    fn test_checkout_request_rejects_unknown_plan() {
        assert!(serde_json::from_str::<CheckoutRequest>(r#"{"plan": "gold"}"#).is_err());
        let req: CheckoutRequest = serde_json::from_str(r#"{"plan": "monthly"}"#).unwrap();
        assert_eq!(req.plan, Plan::Monthly);
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signature() {
        let app = crate::routes::build_router(test_state());
        let payload = r#"{"id":"evt_1","type":"invoice.paid","data":{"object":{}}}"#;
        let response = app
            .oneshot(
                Request::post("/stripe/webhook")
                    .header("stripe-signature", sign_for_test("whsec_wrong", Utc::now().timestamp(), payload))
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_without_signature_is_rejected() {
        let app = crate::routes::build_router(test_state());
        let response = app
            .oneshot(Request::post("/stripe/webhook").body(Body::from("{}")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

//! Thin Stripe REST client: form-encoded requests, JSON responses.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::StripeConfig;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionInfo {
    pub status: String,
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: bool,
}

impl SubscriptionInfo {
    /// Period end sits on the subscription in older API versions and on its items in newer ones.
    fn from_value(sub: &Value) -> Self {
        let period_end = sub
            .get("current_period_end")
            .and_then(Value::as_i64)
            .or_else(|| {
                sub.pointer("/items/data/0/current_period_end")
                    .and_then(Value::as_i64)
            });
        Self {
            status: sub
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            current_period_end: period_end,
            cancel_at_period_end: sub
                .get("cancel_at_period_end")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    config: StripeConfig,
    base_url: String,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self, StripeError> {
        Self::with_base_url(config, STRIPE_API_BASE)
    }

    pub fn with_base_url(config: StripeConfig, base_url: &str) -> Result<Self, StripeError> {
        let http = Client::builder().timeout(Duration::from_secs(20)).build()?;
        Ok(Self {
            http,
            config,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    async fn check(response: Response) -> Result<Value, StripeError> {
        let status = response.status();
        let body: Value = response.json().await?;
        if status.is_success() {
            return Ok(body);
        }
        let message = body
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        Err(StripeError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get(&self, path: &str) -> Result<Value, StripeError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;
        Self::check(response).await
    }

    /// Subscription-mode Checkout Session for one unit of `price_id`.
    pub async fn create_checkout_session(
        &self,
        price_id: &str,
        customer_email: &str,
        success_url: &str,
        cancel_url: &str,
        pack: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let form = [
            ("mode", "subscription"),
            ("line_items[0][price]", price_id),
            ("line_items[0][quantity]", "1"),
            ("customer_email", customer_email),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
            ("metadata[pack]", pack),
        ];
        let response = self
            .http
            .post(format!("{}/checkout/sessions", self.base_url))
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await?;
        let body = Self::check(response).await?;
        let session: CheckoutSession = serde_json::from_value(body).map_err(|e| StripeError::Api {
            status: 200,
            message: format!("unexpected checkout session shape: {e}"),
        })?;
        debug!("Created checkout session {}", session.id);
        Ok(session)
    }

    /// The customer's email, if Stripe has one.
    pub async fn retrieve_customer_email(
        &self,
        customer_id: &str,
    ) -> Result<Option<String>, StripeError> {
        let customer = self.get(&format!("/customers/{customer_id}")).await?;
        Ok(customer
            .get("email")
            .and_then(Value::as_str)
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty()))
    }

    pub async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionInfo, StripeError> {
        let sub = self.get(&format!("/subscriptions/{subscription_id}")).await?;
        Ok(SubscriptionInfo::from_value(&sub))
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> StripeConfig {
    StripeConfig {
        secret_key: "sk_test_123".into(),
        webhook_secret: "whsec_test".into(),
        price_monthly: "price_monthly".into(),
        price_pro: "price_pro".into(),
    }
}

//! Stripe webhook signature verification.
//!
//! `Stripe-Signature: t=<unix>,v1=<hex hmac>[,v1=...]`. The HMAC-SHA256 covers
//! `"<t>.<raw body>"` keyed with the endpoint secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Oldest accepted signature (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Tolerated clock skew for signatures from the future.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Malformed Stripe-Signature header: {0}")]
    Parse(String),

    #[error("Signature does not match")]
    InvalidSignature,

    #[error("Signature timestamp is too old")]
    TimestampOutOfRange,

    #[error("Signature timestamp is in the future")]
    InvalidTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// Every `v1` entry. Stripe sends more than one while a secret is being rolled.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::Parse("invalid header format".into()))?;
            match key {
                "t" => {
                    timestamp = Some(
                        value
                            .parse::<i64>()
                            .map_err(|_| WebhookError::Parse("invalid timestamp".into()))?,
                    );
                }
                "v1" => v1_signatures.push(
                    hex::decode(value)
                        .map_err(|_| WebhookError::Parse("invalid v1 signature hex".into()))?,
                ),
                // v0 and unknown schemes are ignored.
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| WebhookError::Parse("missing timestamp".into()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::Parse("missing v1 signature".into()));
        }
        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Checks the signature against the raw request body as of `now` (unix seconds).
    pub fn verify(&self, payload: &[u8], header: &str, now: i64) -> Result<(), WebhookError> {
        let header = SignatureHeader::parse(header)?;

        let age = now - header.timestamp;
        if age > MAX_EVENT_AGE_SECS {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }

        let expected = self.compute_signature(header.timestamp, payload)?;
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if matched {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

/// Builds a valid `Stripe-Signature` value for tests.
#[cfg(test)]
pub fn sign_for_test(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

//! Adzuna job search client (UK marketplace).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::AdzunaConfig;

const ADZUNA_API_BASE: &str = "https://api.adzuna.com/v1/api/jobs";
const COUNTRY: &str = "gb";
pub const MAX_RESULTS: u32 = 50;

#[derive(Debug, Error)]
pub enum AdzunaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Adzuna returned status {0}")]
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub created: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Clone)]
pub struct AdzunaClient {
    http: Client,
    app_id: String,
    app_key: String,
    base_url: String,
}

impl AdzunaClient {
    pub fn new(config: &AdzunaConfig) -> Result<Self, AdzunaError> {
        Self::with_base_url(config, ADZUNA_API_BASE)
    }

    pub fn with_base_url(config: &AdzunaConfig, base_url: &str) -> Result<Self, AdzunaError> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            http,
            app_id: config.app_id.clone(),
            app_key: config.app_key.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// First page of results. A blank query returns nothing without calling out.
    pub async fn search(
        &self,
        query: &str,
        location: &str,
        results: u32,
    ) -> Result<Vec<JobListing>, AdzunaError> {
        let query = query.trim();
        let location = location.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let per_page = results.clamp(1, MAX_RESULTS).to_string();
        let mut params = vec![
            ("app_id", self.app_id.as_str()),
            ("app_key", self.app_key.as_str()),
            ("results_per_page", per_page.as_str()),
            ("what", query),
            ("content-type", "application/json"),
        ];
        if !location.is_empty() {
            params.push(("where", location));
        }

        let url = format!("{}/{COUNTRY}/search/1", self.base_url);
        let response = self.http.get(&url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdzunaError::Status(status.as_u16()));
        }

        let body: SearchResponse = response.json().await?;
        debug!("Adzuna returned {} results for '{query}'", body.results.len());
        Ok(body.results.iter().map(listing_from_value).collect())
    }
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn listing_from_value(item: &Value) -> JobListing {
    let text = |pointer: &str| str_at(item, pointer).unwrap_or_default().to_string();
    JobListing {
        title: text("/title"),
        company: text("/company/display_name"),
        location: text("/location/display_name"),
        description: text("/description"),
        url: str_at(item, "/redirect_url")
            .or_else(|| str_at(item, "/adref"))
            .unwrap_or_default()
            .to_string(),
        salary_min: item.get("salary_min").and_then(Value::as_f64),
        salary_max: item.get("salary_max").and_then(Value::as_f64),
        created: text("/created"),
    }
}

/// Whole pounds with comma thousands separators.
fn pounds(amount: f64) -> String {
    let whole = amount.trunc() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if whole < 0 {
        format!("£-{out}")
    } else {
        format!("£{out}")
    }
}

pub fn format_salary(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("Salary: {} - {}", pounds(min), pounds(max)),
        (Some(min), None) => format!("Salary: from {}", pounds(min)),
        (None, Some(max)) => format!("Salary: up to {}", pounds(max)),
        (None, None) => String::new(),
    }
}

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::tokens::AuthUser;
use crate::credits::ledger::{self, spend_source, CreditBalance, CreditCost};
use crate::errors::AppError;
use crate::jobs::adzuna::{format_salary, JobListing};
use crate::jobs::cache::{search_key, SEARCH_CACHE_TTL_SECS};
use crate::state::AppState;

const DEFAULT_RESULTS: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub location: String,
    pub results: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct JobView {
    #[serde(flatten)]
    pub listing: JobListing,
    /// Display line such as "Salary: £25,000 - £30,000"; empty when unknown.
    pub salary: String,
}

impl From<JobListing> for JobView {
    fn from(listing: JobListing) -> Self {
        let salary = format_salary(listing.salary_min, listing.salary_max);
        Self { listing, salary }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub jobs: Vec<JobView>,
    pub cached: bool,
    pub credits: CreditBalance,
}

/// GET /api/v1/jobs/search?q=&location=&results=
/// Charges one AI credit per successful search, including empty and cached results.
pub async fn handle_search_jobs(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    auth.require_policies()?;
    let adzuna = state.adzuna.as_ref().ok_or(AppError::NotConfigured("Job search"))?;

    let query = params.q.trim();
    if query.is_empty() {
        return Err(AppError::Validation(
            "Enter keywords to search, for example \"marketing manager\"".into(),
        ));
    }
    let location = params.location.trim();
    let results = params.results.unwrap_or(DEFAULT_RESULTS);

    let user = &auth.0;
    let balance = ledger::balance(&state.db, user.id).await?;
    if !balance.covers(CreditCost::ONE_AI) {
        return Err(AppError::InsufficientCredits(
            "You don't have enough AI credits to perform this search.".into(),
        ));
    }

    let key = search_key(query, location, results);
    let cached = match state.search_cache.get(&key).await {
        Ok(hit) => hit,
        Err(e) => {
            warn!("Job search cache read failed: {e}");
            None
        }
    };

    let (jobs, from_cache) = match cached {
        Some(jobs) => (jobs, true),
        None => {
            let jobs = adzuna
                .search(query, location, results)
                .await
                .map_err(|e| AppError::Upstream(format!("Adzuna search failed: {e}")))?;
            if let Err(e) = state.search_cache.put(&key, &jobs, SEARCH_CACHE_TTL_SECS).await {
                warn!("Job search cache write failed: {e}");
            }
            (jobs, false)
        }
    };

    ledger::spend_or_reject(
        &state.db,
        user.id,
        &spend_source("job_search", user.id),
        CreditCost::ONE_AI,
    )
    .await?;
    let credits = ledger::balance(&state.db, user.id).await?;

    info!(
        "Job search '{query}' in '{location}' for user {}: {} results (cached: {from_cache})",
        user.id,
        jobs.len()
    );

    Ok(Json(SearchResponse {
        jobs: jobs.into_iter().map(JobView::from).collect(),
        cached: from_cache,
        credits,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_view_adds_salary_line() {
        let view = JobView::from(JobListing {
            title: "Nurse".into(),
            company: "NHS".into(),
            location: "Leeds".into(),
            description: String::new(),
            url: "https://example.com".into(),
            salary_min: Some(28000.0),
            salary_max: None,
            created: String::new(),
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["salary"], "Salary: from £28,000");
        assert_eq!(json["title"], "Nurse");
    }

    #[test]
    fn test_search_query_defaults() {
        let q: SearchQuery = serde_json::from_str(r#"{"q": "nurse"}"#).unwrap();
        assert_eq!(q.location, "");
        assert_eq!(q.results, None);
    }
}

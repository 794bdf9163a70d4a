//! AI writing operations. Each function makes the model calls for one assistant
//! action and shapes the output; charging and screening live in the handlers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::llm_client::prompts::{fill, JSON_ONLY_SYSTEM};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::cv::Cv;
use crate::writing::prompts::*;
use crate::writing::text::{
    clean_cover_letter_body, employment_facts, enforce_word_limit, normalize_skills_to_bullets,
    DOCUMENT_WORD_LIMIT, LETTER_WORD_LIMIT, PANEL_WORD_LIMIT,
};

const TEMP_HEADER: f32 = 0.0;
const TEMP_SUMMARY: f32 = 0.4;
const TEMP_JOB_SUMMARY: f32 = 0.4;
const TEMP_COVER_LETTER: f32 = 0.35;
const TEMP_BULLETS: f32 = 0.35;
const TEMP_SKILLS: f32 = 0.2;
const TEMP_PARSE: f32 = 0.0;

/// Who the letter is addressed to, as stated in the job advert. Never guessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobHeader {
    pub company: Option<String>,
    pub addressee_name: Option<String>,
    pub addressee_title: Option<String>,
}

impl JobHeader {
    /// Name for the "Dear ..." line.
    pub fn greeting(&self) -> String {
        [&self.addressee_name, &self.addressee_title]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("Hiring Manager")
            .to_string()
    }

    fn tidy(self) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            company: clean(self.company),
            addressee_name: clean(self.addressee_name),
            addressee_title: clean(self.addressee_title),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverLetterDraft {
    pub body: String,
    pub header: JobHeader,
    pub truncated: bool,
}

fn cv_json(cv: &Cv) -> String {
    serde_json::to_string_pretty(cv).unwrap_or_else(|_| "{}".to_string())
}

/// Rewrites the CV summary. Output is capped at the panel word limit.
pub async fn improve_summary(
    llm: &LlmClient,
    cv: &Cv,
    instructions: &str,
) -> Result<String, LlmError> {
    let prompt = fill(
        SUMMARY_PROMPT,
        &[("instructions", instructions), ("cv_json", &cv_json(cv))],
    );
    let text = llm.call(SUMMARY_SYSTEM, &prompt, TEMP_SUMMARY).await?;
    Ok(enforce_word_limit(&text, PANEL_WORD_LIMIT).0)
}

/// Returns `• Skill` lines only.
pub async fn improve_skills(llm: &LlmClient, skills: &str) -> Result<String, LlmError> {
    let prompt = fill(SKILLS_PROMPT, &[("skills", skills)]);
    let text = llm.call(SKILLS_SYSTEM, &prompt, TEMP_SKILLS).await?;
    Ok(normalize_skills_to_bullets(&text))
}

pub async fn improve_bullets(llm: &LlmClient, description: &str) -> Result<String, LlmError> {
    let prompt = fill(BULLETS_PROMPT, &[("description", description)]);
    llm.call(BULLETS_SYSTEM, &prompt, TEMP_BULLETS).await
}

pub async fn job_summary(llm: &LlmClient, job_description: &str) -> Result<String, LlmError> {
    let (job_description, _) = enforce_word_limit(job_description, DOCUMENT_WORD_LIMIT);
    let prompt = fill(JOB_SUMMARY_PROMPT, &[("job_description", &job_description)]);
    llm.call(JOB_SUMMARY_SYSTEM, &prompt, TEMP_JOB_SUMMARY).await
}

/// Company and addressee from the advert. Any failure yields an all-null header.
pub async fn extract_job_header(llm: &LlmClient, job_description: &str) -> JobHeader {
    if job_description.trim().is_empty() {
        return JobHeader::default();
    }
    let prompt = fill(JOB_HEADER_PROMPT, &[("job_description", job_description)]);
    let system = format!("{JOB_HEADER_SYSTEM} {JSON_ONLY_SYSTEM}");
    match llm.call(&system, &prompt, TEMP_HEADER).await {
        Ok(text) => parse_job_header(&text),
        Err(e) => {
            warn!("Job header extraction failed, continuing without it: {e}");
            JobHeader::default()
        }
    }
}

fn parse_job_header(text: &str) -> JobHeader {
    serde_json::from_str::<JobHeader>(crate::llm_client::strip_json_fences(text))
        .map(JobHeader::tidy)
        .unwrap_or_default()
}

/// Writes a cover letter body grounded in the candidate's own employment facts.
pub async fn cover_letter(
    llm: &LlmClient,
    cv: &Cv,
    job_description: &str,
    job_summary: &str,
) -> Result<CoverLetterDraft, LlmError> {
    let (job_description, _) = enforce_word_limit(job_description, DOCUMENT_WORD_LIMIT);
    let header = extract_job_header(llm, &job_description).await;

    let job_summary = if job_summary.trim().is_empty() {
        "(No job summary provided; use the job description.)"
    } else {
        job_summary.trim()
    };
    let facts = employment_facts(cv);
    let prompt = fill(
        COVER_LETTER_PROMPT,
        &[
            ("job_summary", job_summary),
            ("facts", &facts),
            ("company", header.company.as_deref().unwrap_or_default()),
            ("job_description", &job_description),
            ("cv_json", &cv_json(cv)),
        ],
    );

    let raw = llm
        .call(COVER_LETTER_SYSTEM, &prompt, TEMP_COVER_LETTER)
        .await?;
    let (body, truncated) = enforce_word_limit(&clean_cover_letter_body(&raw), LETTER_WORD_LIMIT);
    Ok(CoverLetterDraft {
        body,
        header,
        truncated,
    })
}

/// Structured CV fields from raw text. Unparseable output becomes an empty object.
pub async fn parse_cv(llm: &LlmClient, raw_text: &str) -> Result<Value, LlmError> {
    let prompt = fill(PARSE_CV_PROMPT, &[("raw_text", raw_text)]);
    let system = format!("{PARSE_CV_SYSTEM} {JSON_ONLY_SYSTEM}");
    let text = llm.call(&system, &prompt, TEMP_PARSE).await?;
    Ok(
        match serde_json::from_str::<Value>(crate::llm_client::strip_json_fences(&text)) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) | Err(_) => {
                warn!("CV parse returned non-object output, using empty result");
                Value::Object(Default::default())
            }
        },
    )
}

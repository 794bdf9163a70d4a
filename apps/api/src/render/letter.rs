//! Cover letter layout shared by the PDF and DOCX renderers.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::cv::non_blank;

pub const DEFAULT_GREETING: &str = "Hiring Manager";

/// Everything printed on a cover letter. Only `full_name` and `body` are required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverLetterInput {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub employer_name: String,
    #[serde(default)]
    pub employer_company: String,
    #[serde(default)]
    pub employer_location: String,
    #[serde(default)]
    pub greeting: String,
    #[serde(default)]
    pub body: String,
}

/// A letter ready to lay out: cleaned paragraphs and resolved header blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct LetterLayout {
    pub candidate_lines: Vec<String>,
    pub date: String,
    pub employer_lines: Vec<String>,
    pub greeting: String,
    pub paragraphs: Vec<String>,
    pub sign_off: String,
    pub full_name: String,
}

pub fn format_letter_date(date: NaiveDate) -> String {
    date.format("%d %B %Y").to_string()
}

/// Short unpunctuated lines such as an address or a company name.
fn is_headerish(line: &str) -> bool {
    let text = line.trim();
    if text.is_empty() {
        return false;
    }
    let words = text.replace(',', " ").split_whitespace().count();
    words > 1 && words <= 6 && !text.ends_with('.')
}

fn contains_ci(haystack_lower: &str, needle: &str) -> bool {
    let needle = needle.trim();
    !needle.is_empty() && haystack_lower.contains(&needle.to_lowercase())
}

/// Drops lines that repeat details already printed in the letter header.
pub fn clean_letter_body(input: &CoverLetterInput, today: &str) -> String {
    let location_tokens: Vec<String> = input
        .location
        .split([',', '/'])
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    let phone = input.phone.trim();

    let kept: Vec<&str> = input
        .body
        .lines()
        .filter(|line| {
            let s = line.trim();
            if s.is_empty() {
                return true;
            }
            let lower = s.to_lowercase();
            let headerish = is_headerish(s);
            let location_hit = location_tokens.iter().any(|t| lower.contains(t.as_str()));
            let employer_hit = headerish
                && (contains_ci(&lower, &input.employer_company)
                    || contains_ci(&lower, &input.employer_location)
                    || (contains_ci(&lower, &input.employer_name) && !lower.contains("dear")));

            let repeats_header = contains_ci(&lower, &input.full_name)
                || contains_ci(&lower, &input.email)
                || (!phone.is_empty() && s.contains(phone))
                || (location_hit && headerish)
                || employer_hit
                || s.contains(today);
            !repeats_header
        })
        .collect();

    kept.join("\n").trim().to_string()
}

pub fn paragraphs(body: &str) -> Vec<String> {
    body.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn present(values: &[&str]) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| non_blank(Some(*v)))
        .map(str::to_string)
        .collect()
}

impl CoverLetterInput {
    pub fn layout(&self, today: NaiveDate) -> LetterLayout {
        let date = format_letter_date(today);
        let body = clean_letter_body(self, &date);
        LetterLayout {
            candidate_lines: present(&[
                self.full_name.as_str(),
                self.location.as_str(),
                self.email.as_str(),
                self.phone.as_str(),
            ]),
            employer_lines: present(&[
                self.employer_name.as_str(),
                self.employer_company.as_str(),
                self.employer_location.as_str(),
            ]),
            greeting: non_blank(Some(self.greeting.as_str()))
                .unwrap_or(DEFAULT_GREETING)
                .to_string(),
            paragraphs: paragraphs(&body),
            sign_off: "Kind regards,".to_string(),
            full_name: self.full_name.trim().to_string(),
            date,
        }
    }
}

//! Pure text shaping applied around AI calls.

use std::collections::HashSet;

use crate::models::cv::Cv;

/// Word cap for the short inputs typed into the assistant panel.
pub const PANEL_WORD_LIMIT: usize = 100;
/// Word cap for pasted job descriptions and generated summaries used in documents.
pub const DOCUMENT_WORD_LIMIT: usize = 300;
/// Word cap for a generated cover letter body.
pub const LETTER_WORD_LIMIT: usize = 300;

/// Keeps the first `max` whitespace-separated words. Returns the text and whether it was cut.
pub fn enforce_word_limit(text: &str, max: usize) -> (String, bool) {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > max {
        (words[..max].join(" "), true)
    } else {
        (text.to_string(), false)
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Turns free-form skills text into a de-duplicated list of `• Skill` lines.
pub fn normalize_skills_to_bullets(text: &str) -> String {
    let mut items: Vec<String> = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let line = line
            .trim_start_matches(|c: char| matches!(c, '•' | '*' | '-' | '–' | '—' | ' ' | '\t'))
            .trim();
        if line.is_empty() {
            continue;
        }

        for part in line.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if is_sentence_like(part) {
                let words: Vec<&str> = part.split_whitespace().collect();
                if words.len() >= 2 {
                    items.push(words.iter().take(3).copied().collect::<Vec<_>>().join(" "));
                }
            } else {
                items.push(part.to_string());
            }
        }
    }

    let mut seen = HashSet::new();
    items
        .iter()
        .map(|item| title_case(item.trim()))
        .filter(|item| !item.is_empty() && seen.insert(item.to_lowercase()))
        .map(|item| format!("• {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_sentence_like(s: &str) -> bool {
    let lower = s.to_lowercase();
    word_count(s) > 6 || lower.contains("result") || lower.contains("through")
}

/// Capitalises every letter that follows a non-letter and lowercases the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Drops greeting lines and trims blank lines from both ends.
pub fn clean_cover_letter_body(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().to_lowercase().starts_with("dear "))
        .collect();

    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].join("\n").trim().to_string(),
        _ => String::new(),
    }
}

/// One `- Title at Company` line per experience, so the model cannot blend roles.
pub fn employment_facts(cv: &Cv) -> String {
    let facts: Vec<String> = cv
        .experiences
        .iter()
        .filter_map(|exp| {
            let title = exp.job_title.trim();
            let company = exp.company.as_deref().unwrap_or_default().trim();
            if title.is_empty() && company.is_empty() {
                None
            } else {
                Some(format!("- {title} at {company}").trim().to_string())
            }
        })
        .collect();

    if facts.is_empty() {
        "- (No experience provided)".to_string()
    } else {
        facts.join("\n")
    }
}

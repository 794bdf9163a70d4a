//! Screens user-supplied text before it reaches the AI service or a document.

use regex::Regex;
use serde::Serialize;

pub const SWEAR_WORDS: &[&str] = &[
    "fuck", "f**k", "f*ck", "shit", "sh*t", "bitch", "b*tch", "bastard", "dick", "prick",
    "bollocks", "twat", "wanker",
];

pub const HATE_SLURS: &[&str] = &["idiot", "stupid", "dumb", "moron", "retard"];

pub const ILLEGAL_CONTENT: &[&str] = &["kill", "stab", "murder", "bomb", "terror", "drug dealing"];

const REPLACEMENT: &str = "unprofessional wording";

/// Outcome of screening one piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SafetyVerdict {
    /// Nothing found; use the text as given.
    Use { text: String },
    /// Offensive words were replaced.
    Cleaned { text: String, warning: String },
    /// The text must be rewritten by the user and is never forwarded.
    Illegal { warning: String },
}

/// Whole-word, case-insensitive match that also catches simple inflections
/// ("killing", "idiots") without flagging unrelated words ("skills").
/// The inflection is part of the match, so replacing it rewrites the whole word.
fn term_regex(term: &str) -> Option<Regex> {
    Regex::new(&format!(
        r"(?i)\b{}(?:s|es|ed|ing|ings|er|ers|ism|ist|ists)?\b",
        regex::escape(term)
    ))
    .ok()
}

fn find_terms<'a>(text: &str, terms: &[&'a str]) -> Vec<&'a str> {
    terms
        .iter()
        .copied()
        .filter(|t| term_regex(t).is_some_and(|re| re.is_match(text)))
        .collect()
}

pub fn validate_and_clean(text: &str) -> SafetyVerdict {
    if text.trim().is_empty() {
        return SafetyVerdict::Use {
            text: text.to_string(),
        };
    }

    if let Some(bad) = find_terms(text, ILLEGAL_CONTENT).first() {
        return SafetyVerdict::Illegal {
            warning: format!(
                "Your text contains illegal content ({bad}). This cannot be used in a CV. Please rewrite it."
            ),
        };
    }

    let swears = find_terms(text, SWEAR_WORDS);
    let slurs = find_terms(text, HATE_SLURS);
    if swears.is_empty() && slurs.is_empty() {
        return SafetyVerdict::Use {
            text: text.to_string(),
        };
    }

    let mut parts = Vec::new();
    if !swears.is_empty() {
        parts.push(format!("Swear words detected: {}", swears.join(", ")));
    }
    if !slurs.is_empty() {
        parts.push(format!("Unprofessional wording: {}", slurs.join(", ")));
    }

    let cleaned = swears.iter().chain(slurs.iter()).fold(text.to_string(), |acc, term| {
        match term_regex(term) {
            Some(re) => re.replace_all(&acc, REPLACEMENT).into_owned(),
            None => acc,
        }
    });

    SafetyVerdict::Cleaned {
        text: cleaned,
        warning: format!(
            "Your text has been rewritten for professionalism.\n\n{}",
            parts.join("\n")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_used_as_is() {
        assert_eq!(
            validate_and_clean("   "),
            SafetyVerdict::Use {
                text: "   ".into()
            }
        );
    }

    #[test]
    fn test_clean_text_passes() {
        let verdict = validate_and_clean("Led a team of five across two stores");
        assert!(matches!(verdict, SafetyVerdict::Use { .. }));
    }

    #[test]
    fn test_illegal_content_is_rejected() {
        let verdict = validate_and_clean("I want to KILL the competition");
        assert!(matches!(verdict, SafetyVerdict::Illegal { warning } if warning.contains("kill")));
    }

    #[test]
    fn test_skills_is_not_illegal() {
        let verdict = validate_and_clean("Strong communication skills and stable attendance");
        assert!(matches!(verdict, SafetyVerdict::Use { .. }));
    }

    #[test]
    fn test_swearing_is_cleaned_case_insensitively() {
        match validate_and_clean("My old boss was a Bastard and an idiot") {
            SafetyVerdict::Cleaned { text, warning } => {
                assert_eq!(
                    text,
                    "My old boss was a unprofessional wording and an unprofessional wording"
                );
                assert!(warning.contains("Swear words detected: bastard"));
                assert!(warning.contains("Unprofessional wording: idiot"));
            }
            other => panic!("expected Cleaned, got {other:?}"),
        }
    }

    #[test]
    fn test_masked_swear_words_are_escaped() {
        match validate_and_clean("what the f**k") {
            SafetyVerdict::Cleaned { text, .. } => {
                assert_eq!(text, "what the unprofessional wording");
            }
            other => panic!("expected Cleaned, got {other:?}"),
        }
    }

    #[test]
    fn test_inflected_words_are_rewritten() {
        for (input, expected) in [
            ("Those idiots on my team", "Those unprofessional wording on my team"),
            ("what the f**king hell", "what the unprofessional wording hell"),
            ("Managed Bastards daily", "Managed unprofessional wording daily"),
        ] {
            match validate_and_clean(input) {
                SafetyVerdict::Cleaned { text, .. } => assert_eq!(text, expected),
                other => panic!("expected Cleaned for {input:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_replacement_keeps_unrelated_words() {
        match validate_and_clean("Read Dickens to a dick") {
            SafetyVerdict::Cleaned { text, .. } => {
                assert_eq!(text, "Read Dickens to a unprofessional wording");
            }
            other => panic!("expected Cleaned, got {other:?}"),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Experience {
    #[serde(default)]
    pub job_title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Free text, one bullet per line.
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Education {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub institution: String,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// The CV form as submitted by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Cv {
    #[serde(default)]
    pub full_name: String,
    pub title: Option<String>,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub full_address: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    pub references: Option<String>,
}

impl Cv {
    /// Rejects a CV without a name or email.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.full_name.trim().is_empty() {
            return Err(AppError::Validation("full_name is required".into()));
        }
        if self.email.trim().is_empty() {
            return Err(AppError::Validation("email is required".into()));
        }
        Ok(())
    }

    /// Full address when present, otherwise the short location.
    pub fn address_line(&self) -> Option<&str> {
        non_blank(self.full_address.as_deref()).or_else(|| non_blank(self.location.as_deref()))
    }

    /// `email | phone | address` with blank parts skipped.
    pub fn contact_line(&self) -> String {
        [
            non_blank(Some(self.email.as_str())),
            non_blank(self.phone.as_deref()),
            self.address_line(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" | ")
    }
}

impl Experience {
    /// "Title – Company", or whichever half is present.
    pub fn header(&self) -> String {
        join_present(&[Some(self.job_title.as_str()), self.company.as_deref()], " – ")
    }

    /// "Location | Start – End".
    pub fn meta(&self) -> String {
        let dates = join_present(
            &[self.start_date.as_deref(), self.end_date.as_deref()],
            " – ",
        );
        join_present(&[self.location.as_deref(), Some(dates.as_str())], " | ")
    }

    /// Description lines with leading bullet glyphs removed.
    pub fn bullet_lines(&self) -> Vec<String> {
        self.description
            .as_deref()
            .unwrap_or_default()
            .lines()
            .map(|l| l.trim_matches(|c: char| c == '•' || c == ' ').trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Education {
    /// "Institution | Location | Start – End".
    pub fn meta(&self) -> String {
        let dates = join_present(
            &[self.start_date.as_deref(), self.end_date.as_deref()],
            " – ",
        );
        join_present(
            &[
                Some(self.institution.as_str()),
                self.location.as_deref(),
                Some(dates.as_str()),
            ],
            " | ",
        )
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn join_present(parts: &[Option<&str>], sep: &str) -> String {
    parts
        .iter()
        .filter_map(|p| non_blank(*p))
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cv() -> Cv {
        Cv {
            full_name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_requires_name_and_email() {
        assert!(cv().validate().is_ok());
        let mut missing = cv();
        missing.full_name = "  ".into();
        assert!(matches!(missing.validate(), Err(AppError::Validation(_))));
        let mut missing = cv();
        missing.email.clear();
        assert!(matches!(missing.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_contact_line_prefers_full_address() {
        let mut c = cv();
        c.phone = Some("07123 456789".into());
        c.location = Some("Leeds".into());
        c.full_address = Some("1 High Street, Leeds".into());
        assert_eq!(
            c.contact_line(),
            "jane@example.com | 07123 456789 | 1 High Street, Leeds"
        );
        c.full_address = Some(" ".into());
        assert_eq!(c.contact_line(), "jane@example.com | 07123 456789 | Leeds");
    }

    #[test]
    fn test_experience_header_and_meta() {
        let exp = Experience {
            job_title: "Owner".into(),
            company: Some("Corner Shop".into()),
            location: None,
            start_date: Some("Jan 2020".into()),
            end_date: Some("Present".into()),
            description: Some("• Ran the till\n\n•Ordered stock".into()),
        };
        assert_eq!(exp.header(), "Owner – Corner Shop");
        assert_eq!(exp.meta(), "Jan 2020 – Present");
        assert_eq!(exp.bullet_lines(), vec!["Ran the till", "Ordered stock"]);
    }

    #[test]
    fn test_deserialize_tolerates_missing_lists() {
        let parsed: Cv =
            serde_json::from_str(r#"{"full_name": "A", "email": "a@b.co"}"#).unwrap();
        assert!(parsed.skills.is_empty());
        assert!(parsed.experiences.is_empty());
    }
}

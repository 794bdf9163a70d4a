//! Maps loosely-shaped parser output onto the CV form.

use serde_json::{Map, Value};

use crate::models::cv::{Cv, Education, Experience};

/// The form holds at most this many experience and education entries.
pub const MAX_ENTRIES: usize = 5;

/// First non-blank string among `keys`. Numbers are accepted and stringified.
fn pick(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Strings, or arrays of strings joined one per line.
fn pick_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            (!joined.is_empty()).then_some(joined)
        }
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

fn list<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Vec<&'a Map<String, Value>> {
    keys.iter()
        .find_map(|k| obj.get(*k)?.as_array().filter(|a| !a.is_empty()))
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .take(MAX_ENTRIES)
                .collect()
        })
        .unwrap_or_default()
}

fn skills(obj: &Map<String, Value>) -> Vec<String> {
    match obj.get("skills") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(['\n', ','])
            .map(|s| s.trim_start_matches(['•', '-', '*', ' ']).trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn experience(obj: &Map<String, Value>) -> Experience {
    Experience {
        job_title: pick(obj, &["job_title", "title"]).unwrap_or_default(),
        company: pick(obj, &["company", "employer"]),
        location: pick(obj, &["location"]),
        start_date: pick(obj, &["start_date", "start"]),
        end_date: pick(obj, &["end_date", "end"]),
        description: pick_text(obj, &["description"]),
    }
}

fn education(obj: &Map<String, Value>) -> Education {
    Education {
        degree: pick(obj, &["degree", "qualification"]).unwrap_or_default(),
        institution: pick(obj, &["institution", "school"]).unwrap_or_default(),
        location: pick(obj, &["location", "city"]),
        start_date: pick(obj, &["start_date", "start"]),
        end_date: pick(obj, &["end_date", "end"]),
    }
}

/// Builds a CV draft from parser output. Anything unrecognised is dropped.
pub fn cv_from_parsed(parsed: &Value) -> Cv {
    let Some(obj) = parsed.as_object() else {
        return Cv::default();
    };

    Cv {
        full_name: pick(obj, &["full_name", "name"]).unwrap_or_default(),
        title: pick(obj, &["title", "headline"]),
        email: pick(obj, &["email"]).unwrap_or_default(),
        phone: pick(obj, &["phone", "telephone"]),
        location: pick(obj, &["location"]),
        full_address: pick(obj, &["full_address", "address"]),
        summary: pick_text(obj, &["summary", "profile"]),
        skills: skills(obj),
        experiences: list(obj, &["experiences", "experience"])
            .into_iter()
            .map(experience)
            .collect(),
        education: list(obj, &["education", "educations"])
            .into_iter()
            .map(education)
            .collect(),
        references: pick_text(obj, &["references"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tolerant_keys() {
        let parsed = json!({
            "name": "Jane Doe",
            "email": "jane@example.com",
            "experience": [{
                "title": "Owner",
                "employer": "Corner Shop",
                "start": "2019",
                "end": "Present",
                "description": ["Ran the till", " ", "Ordered stock"]
            }],
            "educations": [{
                "qualification": "HND Business",
                "school": "Leeds College",
                "city": "Leeds",
                "start_date": 2016
            }]
        });
        let cv = cv_from_parsed(&parsed);
        assert_eq!(cv.full_name, "Jane Doe");
        assert_eq!(cv.experiences[0].job_title, "Owner");
        assert_eq!(cv.experiences[0].company.as_deref(), Some("Corner Shop"));
        assert_eq!(cv.experiences[0].start_date.as_deref(), Some("2019"));
        assert_eq!(
            cv.experiences[0].description.as_deref(),
            Some("Ran the till\nOrdered stock")
        );
        assert_eq!(cv.education[0].degree, "HND Business");
        assert_eq!(cv.education[0].institution, "Leeds College");
        assert_eq!(cv.education[0].location.as_deref(), Some("Leeds"));
        assert_eq!(cv.education[0].start_date.as_deref(), Some("2016"));
    }

    #[test]
    fn test_entries_are_capped() {
        let many: Vec<Value> = (0..8).map(|i| json!({"job_title": format!("Role {i}")})).collect();
        let cv = cv_from_parsed(&json!({ "experiences": many }));
        assert_eq!(cv.experiences.len(), MAX_ENTRIES);
        assert_eq!(cv.experiences[4].job_title, "Role 4");
    }

    #[test]
    fn test_skills_from_list_or_text() {
        let cv = cv_from_parsed(&json!({"skills": ["SQL", " ", "Excel"]}));
        assert_eq!(cv.skills, vec!["SQL", "Excel"]);
        let cv = cv_from_parsed(&json!({"skills": "• SQL\n• Excel, Sage"}));
        assert_eq!(cv.skills, vec!["SQL", "Excel", "Sage"]);
    }

    #[test]
    fn test_non_object_is_empty_cv() {
        assert_eq!(cv_from_parsed(&json!([])), Cv::default());
        assert_eq!(cv_from_parsed(&json!({})), Cv::default());
    }
}

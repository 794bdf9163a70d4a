/// Trims and lowercases an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Shape check for `local@domain.tld`.
///
/// Length 3..=254, a non-empty local part without whitespace, and at least two
/// domain labels of 1..=63 alphanumeric or hyphen characters that do not start
/// or end with a hyphen.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if !(3..=254).contains(&email.len()) {
        return false;
    }

    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') || local.chars().any(char::is_whitespace) {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| is_valid_label(l))
}

fn is_valid_label(label: &str) -> bool {
    (1..=63).contains(&label.len())
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

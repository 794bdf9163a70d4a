//! Dashboard figures and the CSV export, computed from user rows.

use serde::Serialize;

use crate::models::user::UserRow;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub paid_users: i64,
    pub cvs_generated: i64,
    pub ai_actions: i64,
}

pub fn is_paid_plan(plan: &str) -> bool {
    let plan = plan.trim();
    !plan.is_empty() && !plan.eq_ignore_ascii_case("free")
}

pub fn compute_stats(users: &[UserRow]) -> AdminStats {
    AdminStats {
        total_users: users.len() as i64,
        paid_users: users.iter().filter(|u| is_paid_plan(&u.plan)).count() as i64,
        cvs_generated: users.iter().map(|u| i64::from(u.cv_generations)).sum(),
        ai_actions: users.iter().map(UserRow::ai_actions).sum(),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// One exported line. Column names are the spreadsheet headers.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Email")]
    email: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Plan")]
    plan: &'a str,
    #[serde(rename = "Role")]
    role: &'a str,
    #[serde(rename = "Banned")]
    banned: &'static str,
    #[serde(rename = "Policies accepted")]
    policies_accepted: &'static str,
    #[serde(rename = "Accepted at")]
    accepted_at: String,
    #[serde(rename = "Created")]
    created: String,
    #[serde(rename = "CVs")]
    cvs: i32,
    #[serde(rename = "Summaries")]
    summaries: i32,
    #[serde(rename = "Covers")]
    covers: i32,
    #[serde(rename = "Bullets")]
    bullets: i32,
    #[serde(rename = "Job summaries")]
    job_summaries: i32,
    #[serde(rename = "Uploads")]
    uploads: i32,
    #[serde(rename = "Referrals")]
    referrals: i32,
    #[serde(rename = "Referred by")]
    referred_by: &'a str,
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl<'a> From<&'a UserRow> for CsvRow<'a> {
    fn from(u: &'a UserRow) -> Self {
        Self {
            email: &u.email,
            name: u.full_name.as_deref().unwrap_or_default(),
            plan: &u.plan,
            role: &u.role,
            banned: yes_no(u.is_banned),
            policies_accepted: yes_no(u.has_accepted_policies()),
            accepted_at: u
                .accepted_policies_at
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
            created: u.created_at.format(TIMESTAMP_FORMAT).to_string(),
            cvs: u.cv_generations,
            summaries: u.summary_uses,
            covers: u.cover_uses,
            bullets: u.bullets_uses,
            job_summaries: u.job_summary_uses,
            uploads: u.upload_parses,
            referrals: u.referrals_count,
            referred_by: u.referred_by.as_deref().unwrap_or_default(),
        }
    }
}

pub fn users_csv(users: &[UserRow]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for user in users {
        writer.serialize(CsvRow::from(user))?;
    }
    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("CSV flush failed: {e}"))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::sample_user;

    #[test]
    fn test_stats() {
        let mut paid = sample_user();
        paid.plan = "pro".into();
        let mut blank = sample_user();
        blank.plan = String::new();
        let stats = compute_stats(&[sample_user(), paid, blank]);
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.paid_users, 1);
        assert_eq!(stats.cvs_generated, 21);
        assert_eq!(stats.ai_actions, 45);
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(compute_stats(&[]), AdminStats::default());
    }

    #[test]
    fn test_csv_export() {
        let mut user = sample_user();
        user.full_name = Some("Doe, Jane".into());
        let csv = users_csv(&[user]).unwrap();
        let mut lines = csv.lines();
        assert!(lines
            .next()
            .unwrap()
            .starts_with("Email,Name,Plan,Role,Banned,Policies accepted,Accepted at,Created,CVs"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("jane@example.com,\"Doe, Jane\",free,user,No,No,,"));
        assert!(row.ends_with(",7,2,3,4,5,1,0,"));
    }

    #[test]
    fn test_csv_of_nobody_is_empty() {
        assert_eq!(users_csv(&[]).unwrap(), "");
    }
}

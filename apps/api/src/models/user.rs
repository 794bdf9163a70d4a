use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub plan: String,
    pub is_admin: bool,
    pub role: String,
    pub is_banned: bool,
    pub upload_parses: i32,
    pub summary_uses: i32,
    pub cover_uses: i32,
    pub bullets_uses: i32,
    pub cv_generations: i32,
    pub job_summary_uses: i32,
    pub reset_token: Option<String>,
    pub reset_token_created_at: Option<DateTime<Utc>>,
    pub referral_code: Option<String>,
    pub referred_by: Option<String>,
    pub referrals_count: i32,
    pub accepted_policies: bool,
    pub accepted_policies_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn has_accepted_policies(&self) -> bool {
        self.accepted_policies || self.accepted_policies_at.is_some()
    }

    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }

    /// Admin panel access: the legacy flag or an owner/admin role.
    pub fn can_administer(&self) -> bool {
        self.is_admin || matches!(self.role(), Role::Owner | Role::Admin)
    }

    /// Sum of every AI-backed usage counter.
    pub fn ai_actions(&self) -> i64 {
        [
            self.upload_parses,
            self.summary_uses,
            self.cover_uses,
            self.bullets_uses,
            self.job_summary_uses,
        ]
        .iter()
        .map(|n| i64::from(*n))
        .sum()
    }
}

/// A user as returned to clients. Never carries the password hash or reset token.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub plan: String,
    pub role: String,
    pub is_admin: bool,
    pub is_banned: bool,
    pub upload_parses: i32,
    pub summary_uses: i32,
    pub cover_uses: i32,
    pub bullets_uses: i32,
    pub cv_generations: i32,
    pub job_summary_uses: i32,
    pub referral_code: Option<String>,
    pub referred_by: Option<String>,
    pub referrals_count: i32,
    pub accepted_policies: bool,
    pub accepted_policies_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for PublicUser {
    fn from(row: UserRow) -> Self {
        let accepted_policies = row.has_accepted_policies();
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            plan: row.plan,
            role: row.role,
            is_admin: row.is_admin,
            is_banned: row.is_banned,
            upload_parses: row.upload_parses,
            summary_uses: row.summary_uses,
            cover_uses: row.cover_uses,
            bullets_uses: row.bullets_uses,
            cv_generations: row.cv_generations,
            job_summary_uses: row.job_summary_uses,
            referral_code: row.referral_code,
            referred_by: row.referred_by,
            referrals_count: row.referrals_count,
            accepted_policies,
            accepted_policies_at: row.accepted_policies_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Helper,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Helper => "helper",
            Role::User => "user",
        }
    }

    /// Unknown stored values fall back to `User`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "owner" => Role::Owner,
            "admin" => Role::Admin,
            "helper" => Role::Helper,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Monthly,
    Pro,
    OneTime,
    Yearly,
    Premium,
    Enterprise,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Monthly => "monthly",
            Plan::Pro => "pro",
            Plan::OneTime => "one_time",
            Plan::Yearly => "yearly",
            Plan::Premium => "premium",
            Plan::Enterprise => "enterprise",
        }
    }
}

/// Per-user counters bumped after each successful action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageField {
    UploadParses,
    SummaryUses,
    CoverUses,
    BulletsUses,
    CvGenerations,
    JobSummaryUses,
}

impl UsageField {
    /// Column name. Only these fixed names are ever interpolated into SQL.
    pub fn column(&self) -> &'static str {
        match self {
            UsageField::UploadParses => "upload_parses",
            UsageField::SummaryUses => "summary_uses",
            UsageField::CoverUses => "cover_uses",
            UsageField::BulletsUses => "bullets_uses",
            UsageField::CvGenerations => "cv_generations",
            UsageField::JobSummaryUses => "job_summary_uses",
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_user() -> UserRow {
    UserRow {
        id: Uuid::new_v4(),
        email: "jane@example.com".into(),
        password_hash: "secret".into(),
        full_name: Some("Jane Doe".into()),
        plan: "free".into(),
        is_admin: false,
        role: "user".into(),
        is_banned: false,
        upload_parses: 1,
        summary_uses: 2,
        cover_uses: 3,
        bullets_uses: 4,
        cv_generations: 7,
        job_summary_uses: 5,
        reset_token: Some("tok".into()),
        reset_token_created_at: None,
        referral_code: None,
        referred_by: None,
        referrals_count: 0,
        accepted_policies: false,
        accepted_policies_at: None,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_user_hides_secrets() {
        let json = serde_json::to_value(PublicUser::from(sample_user())).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("reset_token").is_none());
        assert_eq!(json["email"], "jane@example.com");
    }

    #[test]
    fn test_policy_timestamp_alone_counts_as_accepted() {
        let mut user = sample_user();
        assert!(!user.has_accepted_policies());
        user.accepted_policies_at = Some(Utc::now());
        assert!(user.has_accepted_policies());
    }

    #[test]
    fn test_can_administer_by_flag_or_role() {
        let mut user = sample_user();
        assert!(!user.can_administer());
        user.role = "helper".into();
        assert!(!user.can_administer());
        user.role = "OWNER".into();
        assert!(user.can_administer());
        user.role = "user".into();
        user.is_admin = true;
        assert!(user.can_administer());
    }

    #[test]
    fn test_ai_actions_excludes_cv_generations() {
        assert_eq!(sample_user().ai_actions(), 15);
    }

    #[test]
    fn test_role_parse_falls_back_to_user() {
        assert_eq!(Role::parse("Helper"), Role::Helper);
        assert_eq!(Role::parse("superuser"), Role::User);
    }
}

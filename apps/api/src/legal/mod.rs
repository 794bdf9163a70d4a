//! Policy documents compiled into the binary.

pub mod handlers;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PolicyDocument {
    pub slug: &'static str,
    pub title: &'static str,
    #[serde(skip)]
    pub markdown: &'static str,
}

pub const DOCUMENTS: [PolicyDocument; 4] = [
    PolicyDocument {
        slug: "accessibility",
        title: "Accessibility",
        markdown: include_str!("../../policies/accessibility.md"),
    },
    PolicyDocument {
        slug: "cookies",
        title: "Cookie Policy",
        markdown: include_str!("../../policies/cookie_policy.md"),
    },
    PolicyDocument {
        slug: "privacy",
        title: "Privacy Policy",
        markdown: include_str!("../../policies/privacy_policy.md"),
    },
    PolicyDocument {
        slug: "terms",
        title: "Terms of Use",
        markdown: include_str!("../../policies/terms_of_use.md"),
    },
];

pub fn find(slug: &str) -> Option<&'static PolicyDocument> {
    let slug = slug.trim().to_ascii_lowercase();
    DOCUMENTS.iter().find(|d| d.slug == slug)
}

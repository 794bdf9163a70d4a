//! Transactional email through the Resend HTTP API.

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::render::html::escape_html;

const RESEND_API_BASE: &str = "https://api.resend.com";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Resend rejected the message (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: String,
    from_email: String,
    app_url: Option<String>,
    base_url: String,
}

impl EmailClient {
    pub fn new(config: &EmailConfig, app_url: Option<String>) -> Result<Self, EmailError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(20))
                .build()?,
            api_key: config.resend_api_key.clone(),
            from_email: config.from_email.clone(),
            app_url,
            base_url: RESEND_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn send_password_reset_email(&self, to: &str, token: &str) -> Result<(), EmailError> {
        let html = password_reset_html(self.app_url.as_deref(), token);
        self.send(to, "Password reset for your account", &html).await?;
        info!("Password reset email sent to {to}");
        Ok(())
    }

    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&SendEmailRequest {
                from: &self.from_email,
                to: [to],
                subject,
                html,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Resend returned {status}: {body}");
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Link to the front end when `APP_URL` is known, otherwise the token alone.
pub fn reset_link(app_url: Option<&str>, token: &str) -> Option<String> {
    app_url
        .map(|u| u.trim().trim_end_matches('/'))
        .filter(|u| !u.is_empty())
        .map(|u| format!("{u}/?reset_token={token}"))
}

fn password_reset_html(app_url: Option<&str>, token: &str) -> String {
    let token = escape_html(token);
    let link_block = match reset_link(app_url, &token) {
        Some(link) => format!(
            "<p><b>Reset link:</b><br/><a href=\"{link}\">{link}</a></p>",
            link = escape_html(&link)
        ),
        None => "<p><b>Reset link:</b> not available, use the token below.</p>".to_string(),
    };

    format!(
        "<p>Hi,</p>\
         <p>We received a request to reset the password for your account.</p>\
         {link_block}\
         <p><b>Token:</b> {token}</p>\
         <p>The token expires in 2 hours. If you did not request this, you can safely ignore this email.</p>\
         <p>Thanks,<br/>Career Support Tools</p>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, app_url: Option<&str>) -> EmailClient {
        let config = EmailConfig {
            resend_api_key: "re_test".into(),
            from_email: "Support <support@example.com>".into(),
        };
        EmailClient::new(&config, app_url.map(str::to_string))
            .unwrap()
            .with_base_url(&server.uri())
    }

    #[test]
    fn test_reset_link() {
        assert_eq!(
            reset_link(Some("https://cv.example.com/"), "abc"),
            Some("https://cv.example.com/?reset_token=abc".to_string())
        );
        assert_eq!(reset_link(Some("  "), "abc"), None);
        assert_eq!(reset_link(None, "abc"), None);
    }

    #[test]
    fn test_html_without_app_url_still_carries_token() {
        let html = password_reset_html(None, "tok123");
        assert!(html.contains("tok123"));
        assert!(!html.contains("href"));
    }

    #[tokio::test]
    async fn test_send_password_reset_email_posts_to_resend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test"))
            .and(body_partial_json(serde_json::json!({
                "from": "Support <support@example.com>",
                "to": ["jane@example.com"],
                "subject": "Password reset for your account"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "e1"})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server, Some("https://cv.example.com"))
            .send_password_reset_email("jane@example.com", "tok")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_2xx_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .send_password_reset_email("jane@example.com", "tok")
            .await
            .unwrap_err();
        assert!(matches!(err, EmailError::Rejected { status: 422, .. }));
    }
}

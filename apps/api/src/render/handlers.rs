use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};

use crate::auth::tokens::AuthUser;
use crate::auth::users;
use crate::credits::ledger::{self, spend_source, CreditCost};
use crate::errors::AppError;
use crate::models::cv::Cv;
use crate::models::user::UsageField;
use crate::render::docx::{cover_letter_docx, cv_docx};
use crate::render::html::{cover_letter_html, cv_html};
use crate::render::letter::CoverLetterInput;
use crate::render::{CvTemplate, PdfRenderer, RenderError};
use crate::state::AppState;
use crate::writing::text::{enforce_word_limit, DOCUMENT_WORD_LIMIT};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocFormat {
    #[default]
    Pdf,
    Docx,
}

impl DocFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            DocFormat::Pdf => "application/pdf",
            DocFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocFormat::Pdf => "pdf",
            DocFormat::Docx => "docx",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    #[serde(default)]
    pub format: DocFormat,
    #[serde(default)]
    pub template: CvTemplate,
}

/// `Jane_Doe_CV.pdf`. Only ASCII letters and digits survive from the name.
pub fn attachment_name(full_name: &str, suffix: &str, format: DocFormat) -> String {
    let name = full_name
        .split_whitespace()
        .map(|w| w.chars().filter(char::is_ascii_alphanumeric).collect::<String>())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if name.is_empty() {
        format!("{suffix}.{}", format.extension())
    } else {
        format!("{name}_{suffix}.{}", format.extension())
    }
}

fn document_response(bytes: Vec<u8>, filename: &str, format: DocFormat) -> Response {
    (
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

pub async fn render_cv_bytes(
    renderer: &dyn PdfRenderer,
    cv: &Cv,
    format: DocFormat,
    template: CvTemplate,
) -> Result<Vec<u8>, RenderError> {
    match format {
        DocFormat::Pdf => renderer.render(&cv_html(cv, template)).await,
        DocFormat::Docx => cv_docx(cv),
    }
}

/// POST /api/v1/documents/cv?format=pdf|docx&template=blue
/// Costs one CV credit, refunded when rendering fails.
pub async fn handle_render_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<DocumentQuery>,
    Json(mut cv): Json<Cv>,
) -> Result<Response, AppError> {
    auth.require_policies()?;
    cv.validate()?;
    if let Some(summary) = cv.summary.take() {
        cv.summary = Some(enforce_word_limit(&summary, DOCUMENT_WORD_LIMIT).0);
    }

    let user = &auth.0;
    let source = spend_source("cv_download", user.id);
    ledger::spend_or_reject(&state.db, user.id, &source, CreditCost::ONE_CV).await?;

    let bytes = match render_cv_bytes(state.pdf.as_ref(), &cv, query.format, query.template).await {
        Ok(bytes) => bytes,
        Err(e) => {
            if let Err(refund_err) =
                ledger::refund(&state.db, user.id, &source, CreditCost::ONE_CV).await
            {
                error!("Refund of {source} failed: {refund_err}");
            }
            return Err(AppError::Internal(anyhow::anyhow!("CV rendering failed: {e}")));
        }
    };

    users::increment_usage(&state.db, user.id, UsageField::CvGenerations).await?;
    info!(
        "Rendered CV ({:?}, {}) for user {}",
        query.format,
        query.template.as_str(),
        user.id
    );

    let filename = attachment_name(&cv.full_name, "CV", query.format);
    Ok(document_response(bytes, &filename, query.format))
}

/// POST /api/v1/documents/cover-letter?format=pdf|docx
/// Free: the letter text was paid for when it was generated.
pub async fn handle_render_cover_letter(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<DocumentQuery>,
    Json(input): Json<CoverLetterInput>,
) -> Result<Response, AppError> {
    auth.require_policies()?;
    if input.full_name.trim().is_empty() {
        return Err(AppError::Validation("full_name is required".into()));
    }
    if input.body.trim().is_empty() {
        return Err(AppError::Validation("body is required".into()));
    }

    let layout = input.layout(Utc::now().date_naive());
    let bytes = match query.format {
        DocFormat::Pdf => state.pdf.render(&cover_letter_html(&layout)).await,
        DocFormat::Docx => cover_letter_docx(&layout),
    }
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Cover letter rendering failed: {e}")))?;

    let filename = attachment_name(&input.full_name, "Cover_Letter", query.format);
    Ok(document_response(bytes, &filename, query.format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRenderer {
        html: Mutex<Option<String>>,
    }

    #[async_trait]
    impl PdfRenderer for RecordingRenderer {
        async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
            *self.html.lock().unwrap() = Some(html.to_string());
            Ok(b"%PDF-1.7".to_vec())
        }
    }

    fn cv() -> Cv {
        Cv {
            full_name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_attachment_name() {
        assert_eq!(attachment_name("Jane  O'Neil", "CV", DocFormat::Pdf), "Jane_ONeil_CV.pdf");
        assert_eq!(attachment_name("  ", "CV", DocFormat::Docx), "CV.docx");
        assert_eq!(attachment_name("Zoë", "Cover_Letter", DocFormat::Pdf), "Zo_Cover_Letter.pdf");
    }

    #[test]
    fn test_query_defaults() {
        let q: DocumentQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.format, DocFormat::Pdf);
        assert_eq!(q.template, CvTemplate::Blue);
        let q: DocumentQuery =
            serde_json::from_str(r#"{"format": "docx", "template": "elegant"}"#).unwrap();
        assert_eq!(q.format, DocFormat::Docx);
        assert_eq!(q.template, CvTemplate::Elegant);
    }

    #[tokio::test]
    async fn test_pdf_goes_through_renderer_with_template() {
        let renderer = RecordingRenderer::default();
        let bytes = render_cv_bytes(&renderer, &cv(), DocFormat::Pdf, CvTemplate::Red)
            .await
            .unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
        let html = renderer.html.lock().unwrap().clone().unwrap();
        assert!(html.contains("template-red"));
    }

    #[tokio::test]
    async fn test_docx_skips_renderer() {
        let renderer = RecordingRenderer::default();
        let bytes = render_cv_bytes(&renderer, &cv(), DocFormat::Docx, CvTemplate::Blue)
            .await
            .unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert!(renderer.html.lock().unwrap().is_none());
    }

    #[test]
    fn test_document_response_headers() {
        let response = document_response(vec![1, 2], "Jane_CV.docx", DocFormat::Docx);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Jane_CV.docx\""
        );
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .contains("wordprocessingml"));
    }
}

// Document rendering: CV and cover letter as PDF (headless Chromium) or DOCX.
// PDF goes HTML first; DOCX is written straight to WordprocessingML.

pub mod docx;
pub mod handlers;
pub mod html;
pub mod letter;
pub mod pdf;
pub mod templates;

use thiserror::Error;

pub use pdf::{ChromiumPdfRenderer, PdfRenderer};
pub use templates::CvTemplate;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error while rendering: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chromium exited with {status}: {stderr}")]
    Chromium { status: String, stderr: String },

    #[error("PDF rendering timed out after {0}s")]
    Timeout(u64),

    #[error("Renderer produced an empty document")]
    Empty,

    #[error("DOCX packaging failed: {0}")]
    Docx(String),
}

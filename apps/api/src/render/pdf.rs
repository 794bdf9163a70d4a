use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::render::RenderError;

pub const RENDER_TIMEOUT_SECS: u64 = 30;

/// HTML to PDF conversion. Swappable so handlers never depend on a browser binary.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

/// Prints HTML to PDF with a headless Chromium process per document.
#[derive(Debug, Clone)]
pub struct ChromiumPdfRenderer {
    chromium_path: PathBuf,
    timeout: Duration,
}

impl ChromiumPdfRenderer {
    pub fn new(chromium_path: impl Into<PathBuf>) -> Self {
        Self {
            chromium_path: chromium_path.into(),
            timeout: Duration::from_secs(RENDER_TIMEOUT_SECS),
        }
    }
}

#[async_trait]
impl PdfRenderer for ChromiumPdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        // Removed on drop, including every early return below.
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("document.html");
        let output = workdir.path().join("document.pdf");
        tokio::fs::write(&input, html).await?;

        let mut command = Command::new(&self.chromium_path);
        command
            .arg("--headless")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-pdf-header-footer")
            .arg(format!("--print-to-pdf={}", output.display()))
            .arg(format!("file://{}", input.display()))
            .kill_on_drop(true);

        debug!("Rendering PDF with {}", self.chromium_path.display());
        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| RenderError::Timeout(self.timeout.as_secs()))??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            error!("Chromium failed ({}): {stderr}", result.status);
            return Err(RenderError::Chromium {
                status: result.status.to_string(),
                stderr,
            });
        }

        let bytes = match tokio::fs::read(&output).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(RenderError::Empty),
            Err(e) => return Err(e.into()),
        };
        if bytes.is_empty() {
            return Err(RenderError::Empty);
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let renderer = ChromiumPdfRenderer::new("/nonexistent/chromium-binary");
        let err = renderer.render("<p>hi</p>").await.unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_process_reports_status() {
        let renderer = ChromiumPdfRenderer::new("false");
        let err = renderer.render("<p>hi</p>").await.unwrap_err();
        assert!(matches!(err, RenderError::Chromium { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_no_output_file_is_empty_error() {
        let renderer = ChromiumPdfRenderer::new("true");
        let err = renderer.render("<p>hi</p>").await.unwrap_err();
        assert!(matches!(err, RenderError::Empty));
    }
}

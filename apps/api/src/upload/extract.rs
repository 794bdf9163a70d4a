//! Plain-text extraction from uploaded CV files.

use std::io::{Cursor, Read};

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type '{0}'. Upload a PDF, DOCX or TXT file")]
    UnsupportedFormat(String),

    #[error("Could not read the Word document: {0}")]
    Docx(String),

    #[error("Could not read the PDF: {0}")]
    Pdf(String),
}

/// Dispatches on the file extension. The result may be empty for image-only files.
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    if bytes.is_empty() {
        return Ok(String::new());
    }

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" => Ok(decode_text(bytes)),
        "docx" => extract_docx(bytes),
        "pdf" => extract_pdf(bytes),
        other => Err(ExtractError::UnsupportedFormat(other.to_string())),
    }
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Reads the text runs of `word/document.xml`, one paragraph per line.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    paragraphs_from_document_xml(&xml)
}

fn paragraphs_from_document_xml(xml: &str) -> Result<String, ExtractError> {
    let paragraph = Regex::new(r"(?s)<w:p[ >].*?</w:p>").map_err(|e| ExtractError::Docx(e.to_string()))?;
    let run = Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab/>|<w:br/>")
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let lines: Vec<String> = paragraph
        .find_iter(xml)
        .map(|p| {
            run.captures_iter(p.as_str())
                .map(|c| match c.get(1) {
                    Some(text) => unescape_xml(text.as_str()),
                    None if c[0].starts_with("<w:tab") => "\t".to_string(),
                    None => "\n".to_string(),
                })
                .collect::<String>()
        })
        .filter(|line| !line.trim().is_empty())
        .collect();

    Ok(lines.join("\n"))
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed files.
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));
    match result {
        Ok(Ok(text)) => Ok(text
            .split("\n\n")
            .map(str::trim)
            .filter(|page| !page.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")),
        Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf("the file could not be parsed".to_string())),
    }
}

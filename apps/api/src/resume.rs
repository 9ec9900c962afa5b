//! Resume ingestion boundary: uploaded file → plain text.

use bytes::Bytes;
use tracing::{info, warn};

/// A candidate's resume: display filename, extracted text and the original file.
#[derive(Debug, Clone)]
pub struct ResumeInput {
    pub filename: String,
    pub text: String,
    pub file: Bytes,
}

impl ResumeInput {
    pub fn new(filename: impl Into<String>, text: impl Into<String>, file: Bytes) -> Self {
        Self {
            filename: filename.into(),
            text: text.into(),
            file,
        }
    }

    /// Plain-text resume whose file contents are the text itself.
    #[cfg(test)]
    pub fn from_text(filename: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let file = Bytes::from(text.clone().into_bytes());
        Self::new(filename, text, file)
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Extracts plain text from an uploaded resume by file extension.
///
/// Supports `.txt`, `.pdf` and `.docx`. Unsupported formats and extraction
/// failures yield an empty string; the caller decides whether that is an error.
pub async fn extract_text(filename: &str, data: Bytes) -> String {
    let extension = file_extension(filename);

    let parse: fn(&[u8]) -> Result<String, String> = match extension.as_str() {
        "txt" => return String::from_utf8_lossy(&data).into_owned(),
        "pdf" => pdf_text,
        "docx" => docx_text,
        other => {
            warn!("Unsupported resume format '{}' for {}", other, filename);
            return String::new();
        }
    };

    let name = filename.to_string();
    match tokio::task::spawn_blocking(move || parse(&data)).await {
        Ok(Ok(text)) => {
            info!("Extracted {} characters from {}", text.len(), name);
            text
        }
        Ok(Err(e)) => {
            warn!("Error extracting text from {}: {}", name, e);
            String::new()
        }
        Err(e) => {
            warn!("Text extraction task for {} failed: {}", name, e);
            String::new()
        }
    }
}

/// Lower-cased extension, empty when there is none.
pub fn file_extension(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

fn pdf_text(data: &[u8]) -> Result<String, String> {
    pdf_extract::extract_text_from_mem(data).map_err(|e| e.to_string())
}

/// Paragraph text of a Word document, one line per paragraph.
fn docx_text(data: &[u8]) -> Result<String, String> {
    let docx = docx_rs::read_docx(data).map_err(|e| e.to_string())?;
    let mut text = String::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            for run in paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = run {
                    for piece in run.children {
                        if let docx_rs::RunChild::Text(t) = piece {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }
    Ok(text)
}

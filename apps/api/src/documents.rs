//! Document-text provider — turns an uploaded résumé into plain text.
//!
//! The ranking engine never looks inside documents; it only sees the text
//! returned here. Extraction failure of any kind yields the empty string,
//! which the pipeline reports as an extraction warning.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

/// One uploaded file, as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedDocument {
    fn is_plain_text(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.starts_with("text/plain"))
            .unwrap_or(false)
            || self.file_name.to_lowercase().ends_with(".txt")
    }
}

#[async_trait]
pub trait DocumentTextProvider: Send + Sync {
    /// Extracted text, or "" when nothing could be extracted.
    async fn extract_text(&self, document: &UploadedDocument) -> String;
}

/// PDF (via `pdf-extract`) and plain-text provider with a soft time budget.
pub struct PdfTextProvider {
    timeout: Duration,
}

impl PdfTextProvider {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl DocumentTextProvider for PdfTextProvider {
    async fn extract_text(&self, document: &UploadedDocument) -> String {
        if document.is_plain_text() {
            return String::from_utf8_lossy(&document.data).into_owned();
        }

        let data = document.data.clone();
        let task = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string())
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(text))) => text,
            Ok(Ok(Err(e))) => {
                warn!(file = %document.file_name, "PDF extraction failed: {e}");
                String::new()
            }
            Ok(Err(e)) => {
                // Join errors include panics inside the PDF parser.
                warn!(file = %document.file_name, "PDF extraction task failed: {e}");
                String::new()
            }
            Err(_) => {
                warn!(
                    file = %document.file_name,
                    "PDF extraction exceeded {}s budget",
                    self.timeout.as_secs()
                );
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, content_type: Option<&str>, data: &'static [u8]) -> UploadedDocument {
        UploadedDocument {
            file_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            data: Bytes::from_static(data),
        }
    }

    #[tokio::test]
    async fn test_plain_text_by_extension() {
        let provider = PdfTextProvider::new(Duration::from_secs(5));
        let text = provider
            .extract_text(&doc("cv.TXT", None, "Python e SQL".as_bytes()))
            .await;
        assert_eq!(text, "Python e SQL");
    }

    #[tokio::test]
    async fn test_plain_text_by_content_type() {
        let provider = PdfTextProvider::new(Duration::from_secs(5));
        let text = provider
            .extract_text(&doc("cv", Some("text/plain; charset=utf-8"), b"ok"))
            .await;
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn test_invalid_pdf_yields_empty_text() {
        let provider = PdfTextProvider::new(Duration::from_secs(5));
        let text = provider
            .extract_text(&doc("cv.pdf", Some("application/pdf"), b"definitely not a pdf"))
            .await;
        assert!(text.is_empty());
    }
}

//! services/api/src/adapters/extract.rs
//!
//! PDF text extraction backed by the `pdf-extract` crate.

use async_trait::async_trait;
use pdf_chat_core::ports::{PortError, PortResult, TextExtractionService};

/// Extracts the text layer of a PDF. Scanned documents without one yield an
/// empty string.
#[derive(Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractionService for PdfTextExtractor {
    async fn extract_text(&self, pdf_bytes: &[u8]) -> PortResult<String> {
        let bytes = pdf_bytes.to_vec();
        // Parsing is CPU-bound; keep it off the async workers.
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| PortError::Unexpected(format!("extraction task failed: {}", e)))?
            .map_err(|e| PortError::Unexpected(format!("could not read PDF text: {}", e)))?;

        // pdf-extract separates pages with form feeds.
        Ok(text.replace('\x0C', "\n").trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bytes_that_are_not_a_pdf_are_an_error() {
        let result = PdfTextExtractor::new().extract_text(b"plain text, not a pdf").await;
        assert!(result.is_err());
    }
}

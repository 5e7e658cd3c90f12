//! PDF-backed text extractor.

use async_trait::async_trait;

use super::{ExtractionError, Page, TextExtractor};

/// Extracts per-page text from PDF bytes using the `pdf-extract` parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Construct a new PDF extractor.
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<Vec<Page>, ExtractionError> {
        let bytes = bytes.to_vec();
        // PDF parsing is CPU-bound; keep it off the async workers.
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|join_error| ExtractionError::Unreadable {
            reason: join_error.to_string(),
        })?
        .map_err(|parse_error| ExtractionError::Unreadable {
            reason: parse_error.to_string(),
        })?;

        tracing::debug!(pages = pages.len(), "Extracted PDF text");

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(idx, text)| Page {
                number: idx as u32 + 1,
                text,
            })
            .collect())
    }
}

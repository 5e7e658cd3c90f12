//! Document text extraction boundary.
//!
//! The ingestion pipeline only ever sees an ordered sequence of
//! [`Page`] values; where the text came from (PDF parser, OCR, plain
//! text) is hidden behind [`TextExtractor`].

use async_trait::async_trait;
use thiserror::Error;

mod pdf;

pub use pdf::PdfExtractor;

/// One page of extracted text, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based source page number.
    pub number: u32,
    /// Raw text content of the page; may be empty for scanned pages.
    pub text: String,
}

/// Errors raised while pulling text out of a source document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Source bytes could not be parsed as a supported document.
    #[error("failed to extract text from document: {reason}")]
    Unreadable {
        /// Diagnostic detail from the underlying parser.
        reason: String,
    },
}

/// Interface implemented by document text extractors.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract per-page text from raw document bytes.
    ///
    /// Pages are returned in reading order with 1-based numbers. A corrupt
    /// or unsupported document fails with [`ExtractionError::Unreadable`];
    /// individual empty pages are not an error.
    async fn extract(&self, bytes: &[u8]) -> Result<Vec<Page>, ExtractionError>;
}

//! Sliding-window passage chunker.
//!
//! Splits page text into overlapping fixed-size passages, the unit of
//! embedding and retrieval. Highlights:
//!
//! - Window widths are measured in Unicode scalar values, never raw bytes,
//!   so a window can never land inside a multi-byte sequence.
//! - Consecutive chunks share `chunk_overlap` characters so spans around
//!   window boundaries stay visible to retrieval.
//! - The final window is clipped to the remaining text; a short last chunk
//!   is allowed, an empty one is never emitted.
//!
//! Splitting is deterministic and purely computational: once a
//! [`ChunkerConfig`] validates, [`ChunkerConfig::split`] cannot fail.

use thiserror::Error;

/// Default maximum characters per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 800;
/// Default characters shared between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

/// Errors raised while validating chunker parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkerConfigError {
    /// Chunk size of zero can never emit a chunk.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap at or above the chunk size would stall the window.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    InvalidOverlap {
        /// Requested overlap width.
        overlap: usize,
        /// Requested chunk size.
        chunk_size: usize,
    },
}

/// Validated sliding-window parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkerConfig {
    /// Validate `chunk_size > 0` and `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkerConfigError> {
        if chunk_size == 0 {
            return Err(ChunkerConfigError::InvalidChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkerConfigError::InvalidOverlap {
                overlap: chunk_overlap,
                chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Maximum characters per chunk.
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters shared between consecutive chunks.
    pub const fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into overlapping passages.
    ///
    /// Walks the text with a window of `chunk_size` characters, advancing
    /// the window start by `chunk_size - chunk_overlap` each step. The last
    /// window is clipped to the remaining text. Whitespace-only or empty
    /// input yields no chunks; pages without extractable text contribute
    /// nothing to an index.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        // Byte offsets of every char boundary, plus the end of the text.
        let mut boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
        boundaries.push(text.len());
        let char_count = boundaries.len() - 1;

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::with_capacity(char_count.div_ceil(step));
        let mut start = 0;

        while start < char_count {
            let end = (start + self.chunk_size).min(char_count);
            chunks.push(text[boundaries[start]..boundaries[end]].to_string());
            if end == char_count {
                break;
            }
            start += step;
        }

        chunks
    }
}

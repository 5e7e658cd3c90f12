//! Embedding provider boundary and the batching adapter built on top of it.
//!
//! [`EmbeddingBackend`] is the raw provider interface: one call, one batch
//! of texts, one vector per text. [`Embedder`] is what the rest of the
//! crate uses; it adds batching, bounded-concurrency dispatch, and retry
//! with exponential backoff for transient provider failures.

use async_trait::async_trait;
use thiserror::Error;

mod adapter;
mod hash;
mod ollama;

pub use adapter::{Embedder, EmbedderConfig};
pub use hash::HashBackend;
pub use ollama::OllamaBackend;

/// Errors raised by an embedding provider for a single batch call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Failure that may succeed on retry (timeout, rate limit, 5xx).
    #[error("transient provider failure: {reason}")]
    Transient {
        /// Diagnostic detail from the provider.
        reason: String,
    },
    /// Failure that will not succeed on retry (auth, malformed request).
    #[error("permanent provider failure: {reason}")]
    Permanent {
        /// Diagnostic detail from the provider.
        reason: String,
    },
}

impl BackendError {
    /// Whether the adapter should retry the failing batch.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Errors surfaced by the [`Embedder`] adapter.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// A single input exceeds the provider's input limit; never truncated
    /// silently. Indicates a chunk size misconfigured for the provider.
    #[error(
        "text at position {index} has {chars} characters, exceeding the provider limit of {limit}"
    )]
    TextTooLarge {
        /// Position of the offending text in the submitted sequence.
        index: usize,
        /// Character count of the offending text.
        chars: usize,
        /// Configured provider input limit.
        limit: usize,
    },
    /// A batch exhausted its retry budget or failed permanently.
    #[error("embedding batch {batch} failed after {attempts} attempt(s): {source}")]
    BatchFailed {
        /// 0-based index of the failing batch.
        batch: usize,
        /// Number of attempts made before giving up.
        attempts: usize,
        /// Final provider error.
        #[source]
        source: BackendError,
    },
    /// Provider returned a different number of vectors than texts sent.
    #[error("embedding batch {batch} returned {actual} vectors for {expected} texts")]
    CountMismatch {
        /// 0-based index of the offending batch.
        batch: usize,
        /// Number of texts submitted in the batch.
        expected: usize,
        /// Number of vectors the provider returned.
        actual: usize,
    },
}

/// Interface implemented by embedding providers.
///
/// One call embeds one batch; positional correspondence between input
/// texts and output vectors is part of the contract, as is a fixed vector
/// dimensionality across calls.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Produce one embedding vector per supplied text, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError>;
}

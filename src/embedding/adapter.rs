//! Batching and retry layer over an [`EmbeddingBackend`].

use std::sync::Arc;
use std::time::Duration;

use futures_util::{StreamExt, TryStreamExt, stream};

use super::{BackendError, EmbeddingBackend, EmbeddingError};

/// Tunables for the [`Embedder`] adapter.
#[derive(Debug, Clone, Copy)]
pub struct EmbedderConfig {
    /// Maximum texts submitted to the provider per call.
    pub batch_size: usize,
    /// Attempts per batch before the operation fails.
    pub max_attempts: usize,
    /// Initial backoff delay; doubles after each transient failure.
    pub base_backoff: Duration,
    /// Maximum embedding batches in flight concurrently.
    pub concurrency: usize,
    /// Provider input limit in characters for a single text.
    pub max_text_chars: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            max_attempts: 3,
            base_backoff: Duration::from_millis(250),
            concurrency: 4,
            max_text_chars: 8_000,
        }
    }
}

/// Embedding adapter used by the index store and the query engine.
///
/// Splits inputs into provider-sized batches, dispatches a bounded number
/// of batches concurrently, and retries transient failures with
/// exponential backoff. Output order always matches input order; a batch
/// that exhausts its retries fails the whole call, so callers never see a
/// partially embedded sequence.
pub struct Embedder {
    backend: Arc<dyn EmbeddingBackend>,
    config: EmbedderConfig,
}

impl Embedder {
    /// Wrap a provider backend with the given tunables.
    pub fn new(backend: Arc<dyn EmbeddingBackend>, config: EmbedderConfig) -> Self {
        Self { backend, config }
    }

    /// Embed every text, preserving positional correspondence.
    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        for (index, text) in texts.iter().enumerate() {
            let chars = text.chars().count();
            if chars > self.config.max_text_chars {
                return Err(EmbeddingError::TextTooLarge {
                    index,
                    chars,
                    limit: self.config.max_text_chars,
                });
            }
        }

        let batch_size = self.config.batch_size.max(1);
        let batches: Vec<Vec<String>> = texts
            .chunks(batch_size)
            .map(|batch| batch.to_vec())
            .collect();
        let batch_count = batches.len();

        // `buffered` keeps completion order aligned with submission order,
        // so the flattened output matches the input sequence.
        let results: Vec<Vec<Vec<f32>>> = stream::iter(
            batches
                .into_iter()
                .enumerate()
                .map(|(batch, texts)| self.embed_batch_with_retry(batch, texts)),
        )
        .buffered(self.config.concurrency.max(1))
        .try_collect()
        .await?;

        tracing::debug!(batches = batch_count, "Embedded all batches");
        Ok(results.into_iter().flatten().collect())
    }

    async fn embed_batch_with_retry(
        &self,
        batch: usize,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut attempt = 1;
        loop {
            match self.backend.embed_batch(&texts).await {
                Ok(vectors) => {
                    if vectors.len() != texts.len() {
                        return Err(EmbeddingError::CountMismatch {
                            batch,
                            expected: texts.len(),
                            actual: vectors.len(),
                        });
                    }
                    return Ok(vectors);
                }
                Err(error) if error.is_transient() && attempt < self.config.max_attempts => {
                    let delay = self.config.base_backoff * 2_u32.pow(attempt as u32 - 1);
                    tracing::warn!(
                        batch,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient embedding failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(source) => {
                    return Err(EmbeddingError::BatchFailed {
                        batch,
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }
}

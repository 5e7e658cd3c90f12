//! Query engine: exact linear-scan similarity search.
//!
//! Every chunk of the target index is scored against the query embedding
//! with cosine similarity. Corpus sizes here are small to medium, so the
//! exact scan is the contract; an approximate-nearest-neighbor index can
//! be substituted behind the same [`QueryEngine::search`] signature
//! without touching callers.

use std::cmp::Ordering;
use std::sync::Arc;

use thiserror::Error;

use crate::embedding::{Embedder, EmbeddingError};
use crate::metrics::RetrievalMetrics;
use crate::store::{IndexStore, StoreError};

/// Default number of results returned by a search.
pub const DEFAULT_TOP_K: usize = 8;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SearchHit {
    /// Identifier of the matching chunk.
    pub chunk_id: String,
    /// Passage content.
    pub text: String,
    /// 1-based source page number, when the source was paginated.
    pub page: Option<u32>,
    /// 0-based position of the chunk within its page.
    pub ord: u32,
    /// Cosine similarity to the query, in `[-1, 1]`.
    pub score: f32,
}

/// Errors raised while answering a query.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Query text could not be embedded.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// Index lookup or chunk load failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Embedding provider returned no vector for the query.
    #[error("embedding provider returned no vector for the query")]
    EmptyEmbedding,
}

/// Answers free-text queries against a stored index.
pub struct QueryEngine {
    index_store: Arc<IndexStore>,
    embedder: Arc<Embedder>,
    metrics: Arc<RetrievalMetrics>,
}

impl QueryEngine {
    /// Assemble a query engine from its collaborators.
    pub fn new(
        index_store: Arc<IndexStore>,
        embedder: Arc<Embedder>,
        metrics: Arc<RetrievalMetrics>,
    ) -> Self {
        Self {
            index_store,
            embedder,
            metrics,
        }
    }

    /// Return the `k` chunks most similar to `query`, ranked by score.
    ///
    /// Results are sorted descending by cosine similarity; equal scores
    /// fall back to ascending `(page, ord)` so rankings are deterministic.
    /// An index with fewer than `k` chunks returns them all, and an empty
    /// index returns an empty list rather than an error.
    pub async fn search(
        &self,
        index_id: &str,
        query: &str,
        k: Option<usize>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let k = k.unwrap_or(DEFAULT_TOP_K);

        let mut vectors = self.embedder.embed(vec![query.to_string()]).await?;
        let query_vector = vectors.pop().ok_or(SearchError::EmptyEmbedding)?;

        let chunks = self.index_store.load_chunks(index_id).await?;
        let candidates = chunks.len();

        let mut hits: Vec<SearchHit> = chunks
            .into_iter()
            .map(|chunk| SearchHit {
                score: cosine_similarity(&query_vector, &chunk.embedding),
                chunk_id: chunk.id,
                text: chunk.text,
                page: chunk.page,
                ord: chunk.ord,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| (a.page, a.ord).cmp(&(b.page, b.ord)))
        });
        hits.truncate(k);

        self.metrics.record_search();
        tracing::debug!(index_id, candidates, returned = hits.len(), "Search answered");
        Ok(hits)
    }
}

/// Cosine similarity `dot(a, b) / (‖a‖ · ‖b‖)`.
///
/// Defined as 0 when either vector has zero magnitude, and as 0 for
/// mismatched dimensionalities (which a well-formed index never holds).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

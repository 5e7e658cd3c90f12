//! Index store service: embedding plus persistence behind one interface.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::embedding::{Embedder, EmbeddingError};

use super::{Chunk, ChunkRecord, Index, RecordStore, StoreError};

/// Errors raised while adding chunks to an index.
#[derive(Debug, Error)]
pub enum IndexStoreError {
    /// Persistence layer rejected or could not serve the request.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Embedding the chunk texts failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Owns persistence of indices and chunks.
///
/// `add_chunks` computes embeddings through the batched
/// [`Embedder`] before persisting; `load_chunks` always returns
/// chunks sorted by `(page, ord)` so callers never depend on write order.
pub struct IndexStore {
    store: Arc<dyn RecordStore>,
    embedder: Arc<Embedder>,
}

impl IndexStore {
    /// Build an index store over a record store and an embedder.
    pub fn new(store: Arc<dyn RecordStore>, embedder: Arc<Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Allocate a fresh index and persist its metadata.
    pub async fn create_index(&self, name: Option<String>) -> Result<Index, StoreError> {
        let index = Index {
            id: Uuid::new_v4().to_string(),
            name,
            created_at: current_timestamp_rfc3339(),
        };
        self.store.put_index(&index).await?;
        tracing::info!(index_id = %index.id, name = ?index.name, "Index created");
        Ok(index)
    }

    /// Fetch index metadata, failing when the id is unknown.
    pub async fn get_index(&self, index_id: &str) -> Result<Index, StoreError> {
        self.store
            .get_index(index_id)
            .await?
            .ok_or_else(|| StoreError::IndexNotFound {
                index_id: index_id.to_string(),
            })
    }

    /// Enumerate all known indexes.
    pub async fn list_indexes(&self) -> Result<Vec<Index>, StoreError> {
        self.store.list_indexes().await
    }

    /// Embed and persist chunk records for an existing index.
    ///
    /// Writes are append-only: submitting overlapping `(page, ord)` pairs
    /// twice creates duplicate chunks by design — re-ingestion belongs in
    /// a new index. Returns the number of chunks written.
    pub async fn add_chunks(
        &self,
        index_id: &str,
        records: Vec<ChunkRecord>,
    ) -> Result<usize, IndexStoreError> {
        self.get_index(index_id).await?;

        if records.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = records.iter().map(|record| record.text.clone()).collect();
        let embeddings = self.embedder.embed(texts).await?;
        debug_assert_eq!(records.len(), embeddings.len());

        let chunks: Vec<Chunk> = records
            .into_iter()
            .zip(embeddings)
            .map(|(record, embedding)| Chunk {
                id: Uuid::new_v4().to_string(),
                index_id: index_id.to_string(),
                text: record.text,
                page: record.page,
                ord: record.ord,
                meta: record.meta,
                embedding,
            })
            .collect();

        let count = chunks.len();
        self.store.append_chunks(chunks).await?;
        tracing::info!(index_id, chunks = count, "Chunks persisted");
        Ok(count)
    }

    /// Load every chunk of an index, sorted by `(page, ord)` ascending.
    ///
    /// An index with zero chunks is a valid empty result; an unknown index
    /// id fails with [`StoreError::IndexNotFound`].
    pub async fn load_chunks(&self, index_id: &str) -> Result<Vec<Chunk>, StoreError> {
        self.get_index(index_id).await?;
        let mut chunks = self.store.list_chunks(index_id).await?;
        chunks.sort_by_key(|chunk| (chunk.page, chunk.ord));
        Ok(chunks)
    }
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

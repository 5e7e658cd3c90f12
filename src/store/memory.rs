//! In-memory record store for tests and local experimentation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Chunk, Index, RecordStore, StoreError};

/// Non-durable [`RecordStore`] keeping everything in process memory.
#[derive(Default)]
pub struct MemoryRecordStore {
    inner: RwLock<Shelves>,
}

#[derive(Default)]
struct Shelves {
    indexes: HashMap<String, Index>,
    chunks: HashMap<String, Vec<Chunk>>,
}

impl MemoryRecordStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put_index(&self, index: &Index) -> Result<(), StoreError> {
        let mut shelves = self.inner.write().await;
        shelves.indexes.insert(index.id.clone(), index.clone());
        Ok(())
    }

    async fn get_index(&self, index_id: &str) -> Result<Option<Index>, StoreError> {
        let shelves = self.inner.read().await;
        Ok(shelves.indexes.get(index_id).cloned())
    }

    async fn append_chunks(&self, chunks: Vec<Chunk>) -> Result<(), StoreError> {
        let mut shelves = self.inner.write().await;
        for chunk in chunks {
            if !shelves.indexes.contains_key(&chunk.index_id) {
                return Err(StoreError::IndexNotFound {
                    index_id: chunk.index_id,
                });
            }
            shelves
                .chunks
                .entry(chunk.index_id.clone())
                .or_default()
                .push(chunk);
        }
        Ok(())
    }

    async fn list_chunks(&self, index_id: &str) -> Result<Vec<Chunk>, StoreError> {
        let shelves = self.inner.read().await;
        Ok(shelves.chunks.get(index_id).cloned().unwrap_or_default())
    }

    async fn list_indexes(&self) -> Result<Vec<Index>, StoreError> {
        let shelves = self.inner.read().await;
        let mut indexes: Vec<Index> = shelves.indexes.values().cloned().collect();
        indexes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(indexes)
    }
}

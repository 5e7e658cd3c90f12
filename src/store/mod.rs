//! Index and chunk persistence.
//!
//! [`RecordStore`] is the durable key/record boundary: it persists index
//! metadata and chunk records and retrieves all chunks belonging to an
//! index. [`IndexStore`] is the service the pipeline and query engine
//! use; it owns a record store plus an [`crate::embedding::Embedder`] and
//! enforces the ordering and referential-integrity rules.

use async_trait::async_trait;
use thiserror::Error;

mod http;
mod memory;
mod service;
mod types;

pub use http::HttpRecordStore;
pub use memory::MemoryRecordStore;
pub use service::{IndexStore, IndexStoreError};
pub use types::{Chunk, ChunkRecord, Index, Meta, MetaValue};

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced index id does not exist.
    #[error("index not found: {index_id}")]
    IndexNotFound {
        /// The missing index identifier.
        index_id: String,
    },
    /// Persistence layer is unreachable; not retried at this layer.
    #[error("record store unavailable: {reason}")]
    Unavailable {
        /// Transport-level diagnostic detail.
        reason: String,
    },
    /// Store responded, but not in the expected shape.
    #[error("record store backend error: {reason}")]
    Backend {
        /// Diagnostic detail from the backend.
        reason: String,
    },
}

/// Interface implemented by durable record stores.
///
/// Chunk writes are append-only; the store never de-duplicates and never
/// mutates records in place. Implementations may return chunks in any
/// order — callers sort by `(page, ord)`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist index metadata.
    async fn put_index(&self, index: &Index) -> Result<(), StoreError>;

    /// Fetch index metadata, or `None` when the id is unknown.
    async fn get_index(&self, index_id: &str) -> Result<Option<Index>, StoreError>;

    /// Append chunk records; every chunk must reference an existing index.
    async fn append_chunks(&self, chunks: Vec<Chunk>) -> Result<(), StoreError>;

    /// Return all chunks belonging to an index, in unspecified order.
    async fn list_chunks(&self, index_id: &str) -> Result<Vec<Chunk>, StoreError>;

    /// Enumerate all known indexes.
    async fn list_indexes(&self) -> Result<Vec<Index>, StoreError>;
}

//! Persisted record shapes shared by every store backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Open metadata mapping carried from ingestion onto every chunk.
pub type Meta = BTreeMap<String, MetaValue>;

/// Scalar metadata value.
///
/// The metadata mapping is open in its keys but closed in its value
/// kinds, keeping the store schema explicit while staying flexible enough
/// for free-form fields like `niveau`, `matiere`, or `cours`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Boolean flag.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Free-form text.
    Text(String),
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A named collection of chunks built from ingested documents.
///
/// Immutable after creation; re-ingestion creates a new index rather than
/// mutating an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Opaque unique identifier, generated at creation.
    pub id: String,
    /// Optional human label; not required to be unique.
    pub name: Option<String>,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

/// Chunk input prior to embedding: what the pipeline hands to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Passage content, non-empty.
    pub text: String,
    /// 1-based source page number, absent for unpaginated sources.
    pub page: Option<u32>,
    /// 0-based position of this chunk within its page.
    pub ord: u32,
    /// Metadata carried through from the ingestion request.
    pub meta: Meta,
}

/// A persisted passage with its embedding.
///
/// Created once during ingestion and never updated in place. Embedding
/// length is constant across all chunks of one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk identifier.
    pub id: String,
    /// Owning index; every chunk belongs to exactly one index.
    pub index_id: String,
    /// Passage content.
    pub text: String,
    /// 1-based source page number, absent for unpaginated sources.
    pub page: Option<u32>,
    /// 0-based position within the page; breaks score ties
    /// deterministically.
    pub ord: u32,
    /// Metadata mapping used for display and filtering, never scoring.
    pub meta: Meta,
    /// Fixed-length embedding vector.
    pub embedding: Vec<f32>,
}

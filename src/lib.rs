#![deny(missing_docs)]

//! Core library for the lectern semantic retrieval engine.
//!
//! Ingests long-form documents (lecture PDFs), splits them into
//! overlapping passages, embeds each passage, persists the vectors, and
//! answers free-text queries with the passages most similar to the query.

/// Sliding-window passage chunker.
pub mod chunker;
/// Environment-driven configuration management.
pub mod config;
/// Embedding provider boundary and batching adapter.
pub mod embedding;
/// Document text extraction boundary.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and query activity counters.
pub mod metrics;
/// Ingestion pipeline orchestration.
pub mod pipeline;
/// Similarity search over stored indexes.
pub mod search;
/// Index and chunk persistence.
pub mod store;

//! Ingestion pipeline: extractor → chunker → index store.

use std::sync::Arc;

use thiserror::Error;

use crate::chunker::ChunkerConfig;
use crate::extract::{ExtractionError, TextExtractor};
use crate::metrics::RetrievalMetrics;
use crate::store::{ChunkRecord, Index, IndexStore, IndexStoreError, Meta, MetaValue, StoreError};

/// Which index an ingestion run should populate.
#[derive(Debug, Clone)]
pub enum IndexTarget {
    /// Create a fresh index, optionally named.
    New {
        /// Optional human label for the new index.
        name: Option<String>,
    },
    /// Append to an existing index.
    Existing {
        /// Identifier of the index to reuse.
        index_id: String,
    },
}

/// Result of a completed ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// The populated (or reused) index.
    pub index: Index,
    /// Number of chunks created by this run.
    pub chunk_count: usize,
}

/// Errors raised while ingesting a document.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Source document unreadable; fatal, nothing retried.
    #[error("document extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    /// Index creation or lookup failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Embedding or persisting the chunk records failed.
    #[error(transparent)]
    IndexStore(#[from] IndexStoreError),
}

/// Orchestrates document ingestion end to end.
///
/// Extraction runs once per document, chunking once per page, embedding
/// once per chunk (batched inside the index store). Ingestion is not
/// atomic: an embedding failure partway leaves whatever chunks earlier
/// calls already committed — callers wanting a clean slate create a new
/// index.
pub struct IngestionPipeline {
    extractor: Arc<dyn TextExtractor>,
    chunker: ChunkerConfig,
    index_store: Arc<IndexStore>,
    metrics: Arc<RetrievalMetrics>,
}

impl IngestionPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        chunker: ChunkerConfig,
        index_store: Arc<IndexStore>,
        metrics: Arc<RetrievalMetrics>,
    ) -> Self {
        Self {
            extractor,
            chunker,
            index_store,
            metrics,
        }
    }

    /// Build an index from a document.
    ///
    /// `source` identifies the document origin (path or URL) and is merged
    /// into every chunk's metadata under the `source` key. Pages yielding
    /// zero chunks (blank or scan-only pages) are skipped without error.
    pub async fn ingest(
        &self,
        document: &[u8],
        target: IndexTarget,
        metadata: Meta,
        source: &str,
    ) -> Result<IngestOutcome, IngestError> {
        let pages = self.extractor.extract(document).await?;
        tracing::info!(source, pages = pages.len(), "Document extracted");

        let index = match target {
            IndexTarget::New { name } => self.index_store.create_index(name).await?,
            IndexTarget::Existing { index_id } => self.index_store.get_index(&index_id).await?,
        };

        let mut meta = metadata;
        meta.insert("source".to_string(), MetaValue::from(source));

        let mut records = Vec::new();
        for page in pages {
            for (ord, text) in self.chunker.split(&page.text).into_iter().enumerate() {
                records.push(ChunkRecord {
                    text,
                    page: Some(page.number),
                    ord: ord as u32,
                    meta: meta.clone(),
                });
            }
        }

        let chunk_count = self.index_store.add_chunks(&index.id, records).await?;
        self.metrics.record_document(chunk_count as u64);
        tracing::info!(
            index_id = %index.id,
            chunks = chunk_count,
            source,
            "Document ingested"
        );

        Ok(IngestOutcome { index, chunk_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{Embedder, EmbedderConfig, HashBackend};
    use crate::extract::Page;
    use crate::store::MemoryRecordStore;
    use async_trait::async_trait;

    /// Extractor returning a canned page list, or failing outright.
    struct FakeExtractor {
        pages: Option<Vec<Page>>,
    }

    #[async_trait]
    impl TextExtractor for FakeExtractor {
        async fn extract(&self, _bytes: &[u8]) -> Result<Vec<Page>, ExtractionError> {
            self.pages
                .clone()
                .ok_or_else(|| ExtractionError::Unreadable {
                    reason: "corrupt".to_string(),
                })
        }
    }

    fn pipeline(pages: Option<Vec<Page>>) -> (IngestionPipeline, Arc<IndexStore>) {
        let embedder = Arc::new(Embedder::new(
            Arc::new(HashBackend::new(8)),
            EmbedderConfig::default(),
        ));
        let index_store = Arc::new(IndexStore::new(
            Arc::new(MemoryRecordStore::new()),
            embedder,
        ));
        let pipeline = IngestionPipeline::new(
            Arc::new(FakeExtractor { pages }),
            ChunkerConfig::default(),
            index_store.clone(),
            Arc::new(RetrievalMetrics::new()),
        );
        (pipeline, index_store)
    }

    fn page(number: u32, text: &str) -> Page {
        Page {
            number,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn thousand_char_page_produces_two_ordered_chunks() {
        let original = "A".repeat(1000);
        let (pipeline, index_store) = pipeline(Some(vec![page(1, &original)]));

        let outcome = pipeline
            .ingest(b"%PDF", IndexTarget::New { name: None }, Meta::new(), "cours.pdf")
            .await
            .expect("ingested");
        assert_eq!(outcome.chunk_count, 2);

        let chunks = index_store.load_chunks(&outcome.index.id).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!((chunks[0].page, chunks[0].ord), (Some(1), 0));
        assert_eq!((chunks[1].page, chunks[1].ord), (Some(1), 1));
        assert_eq!(chunks[0].text.len(), 800);
        assert_eq!(chunks[1].text.len(), 350);

        // Overlap removed, the two chunks reassemble the original page.
        let rebuilt = format!("{}{}", chunks[0].text, &chunks[1].text[150..]);
        assert_eq!(rebuilt, original);
    }

    #[tokio::test]
    async fn blank_pages_are_skipped_without_error() {
        let (pipeline, index_store) = pipeline(Some(vec![
            page(1, "   \n"),
            page(2, "contenu du cours"),
            page(3, ""),
        ]));

        let outcome = pipeline
            .ingest(b"%PDF", IndexTarget::New { name: None }, Meta::new(), "cours.pdf")
            .await
            .expect("ingested");
        assert_eq!(outcome.chunk_count, 1);

        let chunks = index_store.load_chunks(&outcome.index.id).await.unwrap();
        assert_eq!(chunks[0].page, Some(2));
    }

    #[tokio::test]
    async fn metadata_and_source_reach_every_chunk() {
        let (pipeline, index_store) = pipeline(Some(vec![page(1, "alpha"), page(2, "beta")]));

        let mut meta = Meta::new();
        meta.insert("matiere".to_string(), MetaValue::from("maths"));
        meta.insert("niveau".to_string(), MetaValue::from("terminale"));

        let outcome = pipeline
            .ingest(
                b"%PDF",
                IndexTarget::New {
                    name: Some("analyse".to_string()),
                },
                meta,
                "https://exemple.fr/cours.pdf",
            )
            .await
            .expect("ingested");
        assert_eq!(outcome.index.name.as_deref(), Some("analyse"));

        for chunk in index_store.load_chunks(&outcome.index.id).await.unwrap() {
            assert_eq!(chunk.meta.get("matiere"), Some(&MetaValue::from("maths")));
            assert_eq!(
                chunk.meta.get("source"),
                Some(&MetaValue::from("https://exemple.fr/cours.pdf"))
            );
        }
    }

    #[tokio::test]
    async fn existing_index_is_reused() {
        let (pipeline, index_store) = pipeline(Some(vec![page(1, "suite du cours")]));
        let index = index_store.create_index(None).await.unwrap();

        let outcome = pipeline
            .ingest(
                b"%PDF",
                IndexTarget::Existing {
                    index_id: index.id.clone(),
                },
                Meta::new(),
                "cours.pdf",
            )
            .await
            .expect("ingested");
        assert_eq!(outcome.index.id, index.id);
    }

    #[tokio::test]
    async fn reusing_an_unknown_index_fails() {
        let (pipeline, _) = pipeline(Some(vec![page(1, "texte")]));
        let error = pipeline
            .ingest(
                b"%PDF",
                IndexTarget::Existing {
                    index_id: "ghost".to_string(),
                },
                Meta::new(),
                "cours.pdf",
            )
            .await
            .unwrap_err();
        assert!(matches!(error, IngestError::Store(StoreError::IndexNotFound { .. })));
    }

    #[tokio::test]
    async fn extraction_failure_aborts_before_any_index_is_created() {
        let (pipeline, index_store) = pipeline(None);
        let error = pipeline
            .ingest(b"junk", IndexTarget::New { name: None }, Meta::new(), "bad.pdf")
            .await
            .unwrap_err();
        assert!(matches!(error, IngestError::Extraction(_)));
        assert!(index_store.list_indexes().await.unwrap().is_empty());
    }
}

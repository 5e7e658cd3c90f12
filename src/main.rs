use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use lectern::chunker::ChunkerConfig;
use lectern::config::{Config, EmbeddingProviderKind};
use lectern::embedding::{Embedder, EmbeddingBackend, HashBackend, OllamaBackend};
use lectern::extract::PdfExtractor;
use lectern::metrics::RetrievalMetrics;
use lectern::pipeline::{IndexTarget, IngestionPipeline};
use lectern::search::QueryEngine;
use lectern::store::{HttpRecordStore, IndexStore, Meta, MetaValue};

#[derive(Parser)]
#[command(
    name = "lectern",
    about = "Ingest lecture documents and answer semantic queries against them"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a PDF from a local path or URL into an index.
    Ingest {
        /// Local file path or http(s) URL of the document.
        source: String,
        /// Name for a freshly created index.
        #[arg(long, conflicts_with = "index_id")]
        index_name: Option<String>,
        /// Identifier of an existing index to append to.
        #[arg(long)]
        index_id: Option<String>,
        /// Metadata entries attached to every chunk, as key=value.
        #[arg(long = "meta", value_parser = parse_meta_entry)]
        meta: Vec<(String, MetaValue)>,
    },
    /// Query an index for the passages most similar to a text.
    Query {
        /// Identifier of the index to search.
        index_id: String,
        /// Free-text query.
        text: String,
        /// Maximum number of results.
        #[arg(short = 'k', long, default_value_t = lectern::search::DEFAULT_TOP_K)]
        limit: usize,
    },
    /// List known indexes.
    Indexes,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    lectern::logging::init_tracing();

    let config = Config::from_env().context("failed to load configuration")?;
    let cli = Cli::parse();

    let backend: Arc<dyn EmbeddingBackend> = match config.embedding_provider {
        EmbeddingProviderKind::Ollama => Arc::new(
            OllamaBackend::new(&config.ollama_url, &config.embedding_model)
                .context("failed to build Ollama backend")?,
        ),
        EmbeddingProviderKind::Offline => Arc::new(HashBackend::new(config.embedding_dimension)),
    };
    let embedder = Arc::new(Embedder::new(backend, config.embedder_config()));

    let record_store = Arc::new(
        HttpRecordStore::new(&config.store_url, config.store_api_key.clone())
            .context("failed to build record store client")?,
    );
    let index_store = Arc::new(IndexStore::new(record_store, embedder.clone()));
    let metrics = Arc::new(RetrievalMetrics::new());

    match cli.command {
        Command::Ingest {
            source,
            index_name,
            index_id,
            meta,
        } => {
            let chunker: ChunkerConfig = config.chunker_config()?;
            let pipeline = IngestionPipeline::new(
                Arc::new(PdfExtractor::new()),
                chunker,
                index_store,
                metrics,
            );

            let bytes = load_document(&source).await?;
            let target = match index_id {
                Some(index_id) => IndexTarget::Existing { index_id },
                None => IndexTarget::New { name: index_name },
            };
            let metadata: Meta = meta.into_iter().collect();

            let outcome = pipeline
                .ingest(&bytes, target, metadata, &source)
                .await
                .context("ingestion failed")?;
            println!(
                "index {} — {} chunk(s) created",
                outcome.index.id, outcome.chunk_count
            );
        }
        Command::Query {
            index_id,
            text,
            limit,
        } => {
            let engine = QueryEngine::new(index_store, embedder, metrics);
            let hits = engine
                .search(&index_id, &text, Some(limit))
                .await
                .context("search failed")?;
            if hits.is_empty() {
                println!("no results");
            }
            for hit in hits {
                let page = hit
                    .page
                    .map_or_else(|| "-".to_string(), |page| page.to_string());
                println!(
                    "{:>7.4}  p{page} #{ord}  {id}  {text}",
                    hit.score,
                    ord = hit.ord,
                    id = hit.chunk_id,
                    text = preview(&hit.text),
                );
            }
        }
        Command::Indexes => {
            for index in index_store.list_indexes().await? {
                println!(
                    "{}  {}  {}",
                    index.id,
                    index.created_at,
                    index.name.as_deref().unwrap_or("-")
                );
            }
        }
    }

    Ok(())
}

async fn load_document(source: &str) -> Result<Vec<u8>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let response = reqwest::get(source)
            .await
            .with_context(|| format!("failed to fetch {source}"))?;
        if !response.status().is_success() {
            bail!("fetching {source} returned {}", response.status());
        }
        Ok(response.bytes().await?.to_vec())
    } else {
        std::fs::read(source).with_context(|| format!("failed to read {source}"))
    }
}

fn parse_meta_entry(raw: &str) -> Result<(String, MetaValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty metadata key in '{raw}'"));
    }
    let value = if let Ok(flag) = value.parse::<bool>() {
        MetaValue::Bool(flag)
    } else if let Ok(number) = value.parse::<f64>() {
        MetaValue::Number(number)
    } else {
        MetaValue::from(value)
    };
    Ok((key.to_string(), value))
}

fn preview(text: &str) -> String {
    const MAX_PREVIEW: usize = 96;
    let mut preview: String = text.chars().take(MAX_PREVIEW).collect();
    if text.chars().count() > MAX_PREVIEW {
        preview.push('…');
    }
    preview.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_entries_parse_scalar_kinds() {
        assert_eq!(
            parse_meta_entry("matiere=maths").unwrap(),
            ("matiere".to_string(), MetaValue::from("maths"))
        );
        assert_eq!(
            parse_meta_entry("niveau=3").unwrap(),
            ("niveau".to_string(), MetaValue::Number(3.0))
        );
        assert_eq!(
            parse_meta_entry("obligatoire=true").unwrap(),
            ("obligatoire".to_string(), MetaValue::Bool(true))
        );
        assert!(parse_meta_entry("sans-valeur").is_err());
        assert!(parse_meta_entry("=orphelin").is_err());
    }

    #[test]
    fn preview_truncates_long_text() {
        let text = "x".repeat(200);
        let shown = preview(&text);
        assert!(shown.chars().count() <= 97);
        assert!(shown.ends_with('…'));
    }
}

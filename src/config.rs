use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::chunker::{ChunkerConfig, ChunkerConfigError};
use crate::embedding::EmbedderConfig;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Chunking parameters failed validation.
    #[error("Invalid chunking parameters: {0}")]
    InvalidChunking(#[from] ChunkerConfigError),
}

/// Runtime configuration for the lectern engine.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the record-store service.
    pub store_url: String,
    /// Optional API key required by the record store.
    pub store_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProviderKind,
    /// Base URL of the Ollama server, when that provider is selected.
    pub ollama_url: String,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Optional override for the chunk window size in characters.
    pub chunk_size: Option<usize>,
    /// Optional override for the chunk overlap in characters.
    pub chunk_overlap: Option<usize>,
    /// Optional override for texts per embedding batch.
    pub embed_batch_size: Option<usize>,
    /// Optional override for attempts per embedding batch.
    pub embed_max_attempts: Option<usize>,
    /// Optional override for concurrent embedding batches in flight.
    pub embed_concurrency: Option<usize>,
    /// Optional override for the provider's per-text input limit.
    pub embed_max_text_chars: Option<usize>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic offline backend; no model server required.
    Offline,
}

impl std::str::FromStr for EmbeddingProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "offline" => Ok(Self::Offline),
            _ => Err(()),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store_url: load_env("LECTERN_STORE_URL")?,
            store_api_key: load_env_optional("LECTERN_STORE_API_KEY"),
            embedding_provider: load_env("LECTERN_EMBEDDING_PROVIDER")?
                .parse()
                .map_err(|()| {
                    ConfigError::InvalidValue("LECTERN_EMBEDDING_PROVIDER".to_string())
                })?,
            ollama_url: load_env_optional("LECTERN_OLLAMA_URL")
                .unwrap_or_else(|| "http://127.0.0.1:11434".to_string()),
            embedding_model: load_env("LECTERN_EMBEDDING_MODEL")?,
            embedding_dimension: load_env("LECTERN_EMBEDDING_DIMENSION")?
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("LECTERN_EMBEDDING_DIMENSION".to_string())
                })?,
            chunk_size: load_env_parsed("LECTERN_CHUNK_SIZE")?,
            chunk_overlap: load_env_parsed("LECTERN_CHUNK_OVERLAP")?,
            embed_batch_size: load_env_parsed("LECTERN_EMBED_BATCH_SIZE")?,
            embed_max_attempts: load_env_parsed("LECTERN_EMBED_MAX_ATTEMPTS")?,
            embed_concurrency: load_env_parsed("LECTERN_EMBED_CONCURRENCY")?,
            embed_max_text_chars: load_env_parsed("LECTERN_EMBED_MAX_TEXT_CHARS")?,
        })
    }

    /// Build the chunker parameters, applying overrides over the defaults.
    pub fn chunker_config(&self) -> Result<ChunkerConfig, ConfigError> {
        let defaults = ChunkerConfig::default();
        let size = self.chunk_size.unwrap_or(defaults.chunk_size());
        let overlap = self.chunk_overlap.unwrap_or(defaults.chunk_overlap());
        Ok(ChunkerConfig::new(size, overlap)?)
    }

    /// Build the embedder tunables, applying overrides over the defaults.
    pub fn embedder_config(&self) -> EmbedderConfig {
        let defaults = EmbedderConfig::default();
        EmbedderConfig {
            batch_size: self.embed_batch_size.unwrap_or(defaults.batch_size),
            max_attempts: self.embed_max_attempts.unwrap_or(defaults.max_attempts),
            base_backoff: Duration::from_millis(250),
            concurrency: self.embed_concurrency.unwrap_or(defaults.concurrency),
            max_text_chars: self
                .embed_max_text_chars
                .unwrap_or(defaults.max_text_chars),
        }
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

//! HTTP client for a remote record-store service.
//!
//! Speaks a small JSON REST surface: `PUT /indexes/{id}` persists index
//! metadata, `POST /indexes/{id}/chunks` appends chunk records, and the
//! matching `GET` endpoints read them back. Transport failures map to
//! [`StoreError::Unavailable`]; retries belong to the store client, not
//! this layer.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{Chunk, Index, RecordStore, StoreError};

/// Remote [`RecordStore`] backed by a JSON REST service.
pub struct HttpRecordStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct ChunkListResponse {
    chunks: Vec<Chunk>,
}

#[derive(Deserialize)]
struct IndexListResponse {
    indexes: Vec<Index>,
}

impl HttpRecordStore {
    /// Construct a client for the given base URL and optional api key.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent("lectern/0.1")
            .build()
            .map_err(|error| StoreError::Unavailable {
                reason: error.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        index_id: Option<&str>,
    ) -> Result<reqwest::Response, StoreError> {
        let response = req.send().await.map_err(|error| StoreError::Unavailable {
            reason: error.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND
            && let Some(index_id) = index_id
        {
            return Err(StoreError::IndexNotFound {
                index_id: index_id.to_string(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        let error = StoreError::Backend {
            reason: format!("unexpected status {status}: {body}"),
        };
        tracing::error!(error = %error, "Record store request failed");
        Err(error)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        response
            .json()
            .await
            .map_err(|error| StoreError::Backend {
                reason: format!("malformed record store response: {error}"),
            })
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn put_index(&self, index: &Index) -> Result<(), StoreError> {
        let req = self
            .request(Method::PUT, &format!("indexes/{}", index.id))
            .json(index);
        self.send(req, None).await?;
        tracing::debug!(index_id = %index.id, "Index metadata stored");
        Ok(())
    }

    async fn get_index(&self, index_id: &str) -> Result<Option<Index>, StoreError> {
        let req = self.request(Method::GET, &format!("indexes/{index_id}"));
        match self.send(req, Some(index_id)).await {
            Ok(response) => Ok(Some(Self::decode(response).await?)),
            Err(StoreError::IndexNotFound { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn append_chunks(&self, chunks: Vec<Chunk>) -> Result<(), StoreError> {
        // One POST per owning index; in practice a call covers one index.
        let mut grouped: Vec<(String, Vec<Chunk>)> = Vec::new();
        for chunk in chunks {
            match grouped.iter_mut().find(|(id, _)| *id == chunk.index_id) {
                Some((_, bucket)) => bucket.push(chunk),
                None => grouped.push((chunk.index_id.clone(), vec![chunk])),
            }
        }

        for (index_id, bucket) in grouped {
            let count = bucket.len();
            let req = self
                .request(Method::POST, &format!("indexes/{index_id}/chunks"))
                .json(&json!({ "chunks": bucket }));
            self.send(req, Some(&index_id)).await?;
            tracing::debug!(index_id = %index_id, chunks = count, "Chunks appended");
        }
        Ok(())
    }

    async fn list_chunks(&self, index_id: &str) -> Result<Vec<Chunk>, StoreError> {
        let req = self.request(Method::GET, &format!("indexes/{index_id}/chunks"));
        let response = self.send(req, Some(index_id)).await?;
        let payload: ChunkListResponse = Self::decode(response).await?;
        Ok(payload.chunks)
    }

    async fn list_indexes(&self) -> Result<Vec<Index>, StoreError> {
        let req = self.request(Method::GET, "indexes");
        let response = self.send(req, None).await?;
        let payload: IndexListResponse = Self::decode(response).await?;
        Ok(payload.indexes)
    }
}

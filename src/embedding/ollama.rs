//! Ollama HTTP embedding backend.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{BackendError, EmbeddingBackend};

/// Embedding backend talking to an Ollama server's `/api/embed` endpoint.
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaBackend {
    /// Construct a backend for the given server URL and model name.
    pub fn new(base_url: &str, model: &str) -> Result<Self, BackendError> {
        let client = Client::builder()
            .user_agent("lectern/0.1")
            .build()
            .map_err(|error| BackendError::Permanent {
                reason: error.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn classify_status(status: StatusCode, body: String) -> BackendError {
        let reason = format!("Ollama responded {status}: {body}");
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            BackendError::Transient { reason }
        } else {
            BackendError::Permanent { reason }
        }
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaBackend {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                // Connection refused, DNS failure, timeout: all worth retrying.
                BackendError::Transient {
                    reason: error.to_string(),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = Self::classify_status(status, body);
            tracing::warn!(model = %self.model, %status, "Ollama embedding request failed");
            return Err(error);
        }

        let payload: EmbedResponse =
            response
                .json()
                .await
                .map_err(|error| BackendError::Permanent {
                    reason: format!("malformed Ollama response: {error}"),
                })?;

        tracing::debug!(
            model = %self.model,
            texts = texts.len(),
            vectors = payload.embeddings.len(),
            "Generated embeddings"
        );

        Ok(payload.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    #[tokio::test]
    async fn embed_batch_posts_model_and_input() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .json_body(json!({
                        "model": "nomic-embed-text",
                        "input": ["un", "deux"],
                    }));
                then.status(200).json_body(json!({
                    "model": "nomic-embed-text",
                    "embeddings": [[0.1, 0.2], [0.3, 0.4]],
                }));
            })
            .await;

        let backend = OllamaBackend::new(&server.base_url(), "nomic-embed-text").expect("backend");
        let vectors = backend
            .embed_batch(&["un".to_string(), "deux".to_string()])
            .await
            .expect("embeddings");

        mock.assert();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(503).body("model loading");
            })
            .await;

        let backend = OllamaBackend::new(&server.base_url(), "nomic-embed-text").expect("backend");
        let error = backend
            .embed_batch(&["un".to_string()])
            .await
            .unwrap_err();
        assert!(error.is_transient());
    }

    #[tokio::test]
    async fn client_errors_are_permanent() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(404).body("model not found");
            })
            .await;

        let backend = OllamaBackend::new(&server.base_url(), "missing-model").expect("backend");
        let error = backend
            .embed_batch(&["un".to_string()])
            .await
            .unwrap_err();
        assert!(!error.is_transient());
    }
}

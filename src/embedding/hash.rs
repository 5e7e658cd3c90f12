//! Deterministic offline embedding backend.

use async_trait::async_trait;

use super::{BackendError, EmbeddingBackend};

/// Embedding backend that folds text bytes into a normalized vector.
///
/// Produces stable, provider-free embeddings: identical text always maps
/// to the identical unit-length vector. Useful for tests and for running
/// the pipeline without a model server; not semantically meaningful.
pub struct HashBackend {
    dimension: usize,
}

impl HashBackend {
    /// Construct a backend emitting vectors of the given dimensionality.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingBackend for HashBackend {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        if self.dimension == 0 {
            return Err(BackendError::Permanent {
                reason: "embedding dimension must be greater than zero".to_string(),
            });
        }

        Ok(texts
            .iter()
            .map(|text| Self::encode(text, self.dimension))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_text_maps_to_identical_vectors() {
        let backend = HashBackend::new(16);
        let first = backend
            .embed_batch(&["la dérivée".to_string()])
            .await
            .unwrap();
        let second = backend
            .embed_batch(&["la dérivée".to_string()])
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn vectors_are_unit_length() {
        let backend = HashBackend::new(8);
        let vectors = backend
            .embed_batch(&["intégrale".to_string()])
            .await
            .unwrap();
        let norm = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn zero_dimension_is_rejected() {
        let backend = HashBackend::new(0);
        let error = backend.embed_batch(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(error, BackendError::Permanent { .. }));
    }
}

//! Embedder trait — text in, vector out.
//!
//! Shared by ingestion (batch over chunks) and retrieval (single query).

use async_trait::async_trait;
use crate::error::EmbeddingError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        match vectors.len() {
            1 => Ok(vectors.remove(0)),
            n => Err(EmbeddingError::Malformed(format!("expected 1 vector, got {n}"))),
        }
    }

    /// Embed many texts. The result has one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError>;

    /// The fixed output dimension, when known ahead of time.
    fn dimension(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    struct EmptyEmbedder;

    #[async_trait]
    impl Embedder for EmptyEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn single_embed_uses_batch() {
        let v = LengthEmbedder.embed("abc").await.unwrap();
        assert_eq!(v, vec![3.0, 1.0]);
    }

    #[tokio::test]
    async fn single_embed_rejects_wrong_count() {
        let err = EmptyEmbedder.embed("abc").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Malformed(_)));
    }
}

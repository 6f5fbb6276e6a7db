//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially;
/// backends that support native batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use analyst_rag::EmbeddingProvider;
///
/// let provider = HashingEmbeddingProvider::new(256)?;
/// let embedding = provider.embed("operating margin").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially for each input.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// A deterministic, offline embedding based on feature hashing.
///
/// Each lower-cased alphanumeric token is hashed into one of `dimensions`
/// buckets and the bucket counts are L2-normalised, so texts that share
/// vocabulary score higher under cosine similarity. Good enough for demos and
/// tests; it has no notion of synonyms.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl HashingEmbeddingProvider {
    /// Create a provider producing vectors of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::EmbeddingError {
                provider: "Hashing".into(),
                message: "dimensions must be greater than zero".into(),
            });
        }
        Ok(Self { dimensions })
    }

    fn bucket(&self, token: &str) -> usize {
        // FNV-1a
        let hash = token.bytes().fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
            (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric() && c != '&') {
            if !token.is_empty() {
                embedding[self.bucket(token)] += 1.0;
            }
        }
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashing_embedding_is_deterministic_and_normalised() {
        let provider = HashingEmbeddingProvider::new(64).unwrap();
        let a = provider.embed("Tesla revenue grew").await.unwrap();
        let b = provider.embed("tesla REVENUE grew").await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let provider = HashingEmbeddingProvider::new(8).unwrap();
        assert!(provider.embed("  ").await.unwrap().iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn default_batch_matches_single_calls() {
        let provider = HashingEmbeddingProvider::new(32).unwrap();
        let batch = provider.embed_batch(&["margin", "risk factors"]).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], provider.embed("risk factors").await.unwrap());
    }

    #[test]
    fn zero_dimensions_is_rejected() {
        assert!(HashingEmbeddingProvider::new(0).is_err());
    }
}

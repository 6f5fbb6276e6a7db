//! In-memory embedding index using cosine similarity.
//!
//! [`InMemoryIndex`] keeps an immutable snapshot of embedded chunks behind a
//! `tokio::sync::RwLock`. A rebuild embeds the whole corpus first and then
//! swaps the snapshot in one step, so searches running during a rebuild keep
//! reading the previous snapshot. Rebuilds are serialized and publish in the
//! order they started.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::{EmbeddingIndex, MetadataFilter};

#[derive(Debug)]
struct Entry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// An in-memory embedding index, rebuilt from scratch on every ingestion.
///
/// # Example
///
/// ```rust,ignore
/// use analyst_rag::{HashingEmbeddingProvider, InMemoryIndex};
///
/// let index = InMemoryIndex::new(Arc::new(HashingEmbeddingProvider::new(256)?));
/// index.rebuild(chunks).await?;
/// ```
pub struct InMemoryIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    snapshot: RwLock<Option<Arc<Vec<Entry>>>>,
    rebuild_lock: Mutex<()>,
}

impl InMemoryIndex {
    /// Create an unbuilt index that embeds with `embedder`.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, snapshot: RwLock::new(None), rebuild_lock: Mutex::new(()) }
    }

    /// Replace the whole index with `chunks`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyCorpus`] if `chunks` is empty, or
    /// [`RagError::EmbeddingError`] if the embedder fails. On error the
    /// previous snapshot stays in place.
    pub async fn rebuild(&self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Err(RagError::EmptyCorpus);
        }
        let _rebuilding = self.rebuild_lock.lock().await;

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await.map_err(|e| {
            error!(chunk_count = chunks.len(), error = %e, "embedding failed during rebuild");
            e
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: "InMemory".into(),
                message: format!(
                    "expected {} embeddings, provider returned {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }

        let entries: Vec<Entry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| Entry { chunk, embedding })
            .collect();
        let count = entries.len();

        *self.snapshot.write().await = Some(Arc::new(entries));
        info!(chunk_count = count, "embedding index rebuilt");
        Ok(count)
    }

    /// Drop the current snapshot, returning the index to the unbuilt state.
    ///
    /// Waits for an in-flight rebuild, so its result does not reappear.
    pub async fn clear(&self) {
        let _rebuilding = self.rebuild_lock.lock().await;
        *self.snapshot.write().await = None;
    }

    /// Whether the index has been built.
    pub async fn is_built(&self) -> bool {
        self.snapshot.read().await.is_some()
    }

    /// Number of indexed chunks (zero when unbuilt).
    pub async fn len(&self) -> usize {
        self.snapshot.read().await.as_ref().map_or(0, |s| s.len())
    }

    /// Whether the index holds no chunks.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Clone of every indexed chunk, in insertion order.
    pub async fn chunks(&self) -> Result<Vec<Chunk>> {
        let snapshot = self.current().await?;
        Ok(snapshot.iter().map(|e| e.chunk.clone()).collect())
    }

    async fn current(&self) -> Result<Arc<Vec<Entry>>> {
        self.snapshot.read().await.clone().ok_or(RagError::NotInitialized)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl EmbeddingIndex for InMemoryIndex {
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        let snapshot = self.current().await?;
        let query_embedding = self.embedder.embed(query).await?;

        let mut scored: Vec<SearchResult> = snapshot
            .iter()
            .filter(|entry| filter.is_none_or(|f| f.matches(&entry.chunk.metadata)))
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.embedding, &query_embedding),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        debug!(query, k, result_count = scored.len(), "index search");
        Ok(scored)
    }
}

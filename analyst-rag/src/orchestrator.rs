//! Multi-query retrieval with content-prefix deduplication.
//!
//! [`RetrievalOrchestrator`] turns a question into an ordered, deduplicated
//! list of chunks. It works in one of two modes:
//!
//! - **Expanded**: the question plus per-company variants for comparative
//!   questions, searched one after another, merged in variant order and
//!   capped at `max_chunks`.
//! - **Balanced**: when the caller names two or more entities, each entity
//!   gets its own search and a fixed share of the result, so a company with
//!   fewer matching chunks is not crowded out by global similarity ranking.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::AnalystConfig;
use crate::document::{Chunk, ContentKey};
use crate::entities::EntityVocabulary;
use crate::error::Result;
use crate::vectorstore::EmbeddingIndex;

/// How a [`Retrieval`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Question plus comparative variants, globally ranked.
    Expanded,
    /// One dedicated search per caller-named entity.
    Balanced,
}

/// The outcome of one retrieval call.
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    /// The mode that was used.
    pub mode: RetrievalMode,
    /// Search strings sent to the index, in issue order.
    pub queries: Vec<String>,
    /// Retrieved chunks, most relevant first, no two sharing a [`ContentKey`].
    pub chunks: Vec<Chunk>,
}

impl Retrieval {
    /// Whether nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Tracks content keys already emitted within one retrieval call.
#[derive(Debug, Default)]
struct SeenContent(HashSet<ContentKey>);

impl SeenContent {
    /// Record `chunk`, returning `false` if its key was already present.
    fn insert(&mut self, chunk: &Chunk) -> bool {
        self.0.insert(chunk.content_key())
    }
}

/// Decides which chunks are passed to answer generation.
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = RetrievalOrchestrator::new(index, EntityVocabulary::default(), config);
/// let retrieval = orchestrator
///     .retrieve("Compare Acme and Zenith", Some(&["Acme".into(), "Zenith".into()]))
///     .await?;
/// ```
pub struct RetrievalOrchestrator {
    index: Arc<dyn EmbeddingIndex>,
    vocabulary: EntityVocabulary,
    config: AnalystConfig,
}

impl RetrievalOrchestrator {
    /// Create an orchestrator over `index`.
    pub fn new(
        index: Arc<dyn EmbeddingIndex>,
        vocabulary: EntityVocabulary,
        config: AnalystConfig,
    ) -> Self {
        Self { index, vocabulary, config }
    }

    /// Return the entity vocabulary used for query expansion.
    pub fn vocabulary(&self) -> &EntityVocabulary {
        &self.vocabulary
    }

    /// Retrieve chunks for `query`.
    ///
    /// With two or more `entities` the balanced mode is used; otherwise the
    /// expanded mode. In balanced mode the per-entity limit is applied to
    /// the company-filtered results before deduplication, so a duplicate
    /// still counts toward its entity's limit.
    ///
    /// # Errors
    ///
    /// Propagates index errors, notably
    /// [`RagError::NotInitialized`](crate::RagError::NotInitialized).
    pub async fn retrieve(&self, query: &str, entities: Option<&[String]>) -> Result<Retrieval> {
        match entities {
            Some(entities) if entities.len() >= 2 => self.retrieve_balanced(entities).await,
            _ => self.retrieve_expanded(query).await,
        }
    }

    async fn retrieve_expanded(&self, query: &str) -> Result<Retrieval> {
        let queries = self.vocabulary.search_variants(query);
        let mut seen = SeenContent::default();
        let mut chunks = Vec::new();

        for variant in &queries {
            let results = self.index.search(variant, self.config.variant_top_k, None).await?;
            debug!(variant = %variant, result_count = results.len(), "variant searched");
            for result in results {
                if seen.insert(&result.chunk) {
                    chunks.push(result.chunk);
                }
            }
        }
        chunks.truncate(self.config.max_chunks);

        info!(
            mode = "expanded",
            variant_count = queries.len(),
            chunk_count = chunks.len(),
            "retrieval completed"
        );
        Ok(Retrieval { mode: RetrievalMode::Expanded, queries, chunks })
    }

    async fn retrieve_balanced(&self, entities: &[String]) -> Result<Retrieval> {
        let mut seen = SeenContent::default();
        let mut queries = Vec::with_capacity(entities.len());
        let mut chunks = Vec::new();

        for entity in entities {
            let entity_query = format!("{entity} {}", self.config.balanced_query_suffix);
            let results = self.index.search(&entity_query, self.config.balanced_top_k, None).await?;

            let before = chunks.len();
            for result in results
                .into_iter()
                .filter(|r| r.chunk.belongs_to(entity))
                .take(self.config.per_entity_limit)
            {
                if seen.insert(&result.chunk) {
                    chunks.push(result.chunk);
                }
            }
            debug!(entity = %entity, chunk_count = chunks.len() - before, "entity searched");
            queries.push(entity_query);
        }

        info!(
            mode = "balanced",
            entity_count = entities.len(),
            chunk_count = chunks.len(),
            "retrieval completed"
        );
        Ok(Retrieval { mode: RetrievalMode::Balanced, queries, chunks })
    }
}

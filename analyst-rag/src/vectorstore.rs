//! The embedding index seam: similarity search over stored chunks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{ChunkMetadata, SearchResult};
use crate::error::Result;

/// Exact-equality constraints on chunk metadata.
///
/// Unset fields match anything; set fields must match exactly (case
/// sensitive), all of them at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataFilter {
    /// Required `source` value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Required `type` value.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    /// Required `company` value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl MetadataFilter {
    /// A filter on the `company` field only.
    pub fn company(company: impl Into<String>) -> Self {
        Self { company: Some(company.into()), ..Self::default() }
    }

    /// Whether `metadata` satisfies every constraint.
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        fn field_ok(expected: &Option<String>, actual: &str) -> bool {
            expected.as_deref().is_none_or(|e| e == actual)
        }
        field_ok(&self.source, &metadata.source)
            && field_ok(&self.doc_type, &metadata.doc_type)
            && field_ok(&self.company, &metadata.company)
    }
}

/// A searchable index of embedded chunks.
///
/// The index owns embedding of the query text; callers pass plain strings.
///
/// # Example
///
/// ```rust,ignore
/// use analyst_rag::{EmbeddingIndex, InMemoryIndex};
///
/// let index = InMemoryIndex::new(Arc::new(embedder));
/// index.rebuild(chunks).await?;
/// let results = index.search("Acme revenue", 5, None).await?;
/// ```
#[async_trait]
pub trait EmbeddingIndex: Send + Sync {
    /// Return the `k` most similar chunks to `query` that pass `filter`.
    ///
    /// Results are ordered by descending similarity.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotInitialized`](crate::RagError::NotInitialized)
    /// if the index has not been built.
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(company: &str) -> ChunkMetadata {
        ChunkMetadata {
            source: "acme.pdf".into(),
            doc_type: "10-K".into(),
            company: company.into(),
            chunk_id: 3,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(MetadataFilter::default().matches(&metadata("Acme")));
    }

    #[test]
    fn company_filter_is_exact() {
        let filter = MetadataFilter::company("Acme");
        assert!(filter.matches(&metadata("Acme")));
        assert!(!filter.matches(&metadata("acme")));
    }

    #[test]
    fn all_fields_must_match() {
        let filter = MetadataFilter {
            doc_type: Some("Earnings Call".into()),
            ..MetadataFilter::company("Acme")
        };
        assert!(!filter.matches(&metadata("Acme")));
    }
}

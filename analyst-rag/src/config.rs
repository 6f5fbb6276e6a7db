//! Configuration for retrieval, answering, ingestion, and admission control.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the analyst.
///
/// Every field has a default, so a partial JSON document deserializes into a
/// complete configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalystConfig {
    /// Results requested from the index for each unconstrained search variant.
    pub variant_top_k: usize,
    /// Maximum number of chunks kept by unconstrained retrieval.
    pub max_chunks: usize,
    /// Results requested from the index for each entity in balanced retrieval.
    pub balanced_top_k: usize,
    /// Maximum number of chunks kept per entity in balanced retrieval.
    pub per_entity_limit: usize,
    /// Text appended to the entity name to form the balanced search query.
    pub balanced_query_suffix: String,
    /// Maximum number of source citations attached to an answer.
    pub max_citations: usize,
    /// Number of content characters shown in each citation.
    pub citation_preview_chars: usize,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Queries admitted per quota window.
    pub queries_per_window: u32,
    /// Length of the quota window in seconds.
    pub quota_window_secs: u64,
    /// Largest accepted document, in bytes.
    pub max_document_bytes: usize,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            variant_top_k: 5,
            max_chunks: 15,
            balanced_top_k: 10,
            per_entity_limit: 7,
            balanced_query_suffix: "revenue financial performance".to_string(),
            max_citations: 10,
            citation_preview_chars: 300,
            chunk_size: 1000,
            chunk_overlap: 200,
            queries_per_window: 10,
            quota_window_secs: 3600,
            max_document_bytes: 10 * 1024 * 1024,
        }
    }
}

impl AnalystConfig {
    /// Create a new builder for constructing an [`AnalystConfig`].
    pub fn builder() -> AnalystConfigBuilder {
        AnalystConfigBuilder::default()
    }

    /// Parse a JSON configuration and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] on malformed JSON or invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RagError::ConfigError(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - any of the search sizes or limits is zero
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        let nonzero = [
            ("variant_top_k", self.variant_top_k),
            ("max_chunks", self.max_chunks),
            ("balanced_top_k", self.balanced_top_k),
            ("per_entity_limit", self.per_entity_limit),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(RagError::ConfigError(format!("{name} must be greater than zero")));
            }
        }
        if self.quota_window_secs == 0 {
            return Err(RagError::ConfigError(
                "quota_window_secs must be greater than zero".to_string(),
            ));
        }
        let window = i64::try_from(self.quota_window_secs).ok().and_then(TimeDelta::try_seconds);
        if window.is_none() {
            return Err(RagError::ConfigError(format!(
                "quota_window_secs ({}) is out of range",
                self.quota_window_secs
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`AnalystConfig`].
#[derive(Debug, Clone, Default)]
pub struct AnalystConfigBuilder {
    config: AnalystConfig,
}

impl AnalystConfigBuilder {
    /// Set the per-variant search size for unconstrained retrieval.
    pub fn variant_top_k(mut self, k: usize) -> Self {
        self.config.variant_top_k = k;
        self
    }

    /// Set the cap on chunks returned by unconstrained retrieval.
    pub fn max_chunks(mut self, max: usize) -> Self {
        self.config.max_chunks = max;
        self
    }

    /// Set the per-entity search size for balanced retrieval.
    pub fn balanced_top_k(mut self, k: usize) -> Self {
        self.config.balanced_top_k = k;
        self
    }

    /// Set the per-entity chunk cap for balanced retrieval.
    pub fn per_entity_limit(mut self, limit: usize) -> Self {
        self.config.per_entity_limit = limit;
        self
    }

    /// Set the text appended to entity names in balanced searches.
    pub fn balanced_query_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.balanced_query_suffix = suffix.into();
        self
    }

    /// Set the number of citations attached to answers.
    pub fn max_citations(mut self, max: usize) -> Self {
        self.config.max_citations = max;
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the query quota per window.
    pub fn queries_per_window(mut self, limit: u32) -> Self {
        self.config.queries_per_window = limit;
        self
    }

    /// Set the quota window length in seconds.
    pub fn quota_window_secs(mut self, secs: u64) -> Self {
        self.config.quota_window_secs = secs;
        self
    }

    /// Set the largest accepted document size in bytes.
    pub fn max_document_bytes(mut self, bytes: usize) -> Self {
        self.config.max_document_bytes = bytes;
        self
    }

    /// Build the [`AnalystConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`AnalystConfig::validate`].
    pub fn build(self) -> Result<AnalystConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

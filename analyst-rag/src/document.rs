//! Data types for documents, chunks, and search results.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of leading characters of a chunk's content that identify it for
/// deduplication.
pub const DEDUP_PREFIX_CHARS: usize = 200;

/// A source document whose text has already been extracted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Where the text came from (usually a file path).
    pub source: String,
    /// The extracted text content.
    pub text: String,
    /// The document type, e.g. `10-K` or `Earnings Call`.
    pub doc_type: String,
    /// The company the document is about.
    pub company: String,
}

impl Document {
    /// Create a new document.
    pub fn new(
        source: impl Into<String>,
        text: impl Into<String>,
        doc_type: impl Into<String>,
        company: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            doc_type: doc_type.into(),
            company: company.into(),
        }
    }
}

/// Provenance attached to every [`Chunk`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChunkMetadata {
    /// The source of the parent document.
    pub source: String,
    /// The parent document's type.
    #[serde(rename = "type")]
    pub doc_type: String,
    /// The company the parent document is about.
    pub company: String,
    /// Zero-based position of the chunk within its document.
    pub chunk_id: usize,
}

/// A bounded span of document text plus its provenance.
///
/// Chunks are immutable once created; embeddings live in the index, not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// The text content of the chunk.
    pub content: String,
    /// Provenance metadata.
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Return the deduplication key of this chunk.
    pub fn content_key(&self) -> ContentKey {
        ContentKey::of(&self.content)
    }

    /// Whether this chunk is tagged with `company`, ignoring case.
    pub fn belongs_to(&self, company: &str) -> bool {
        self.metadata.company.to_lowercase() == company.to_lowercase()
    }
}

/// Deduplication identity of a chunk.
///
/// SHA-256 over the first [`DEDUP_PREFIX_CHARS`] characters of the content.
/// Two distinct chunks sharing that prefix (repeated boilerplate, for
/// instance) get the same key and only the first one is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    /// Compute the key for a piece of chunk content.
    pub fn of(content: &str) -> Self {
        let end = content.char_indices().nth(DEDUP_PREFIX_CHARS).map_or(content.len(), |(i, _)| i);
        let digest = Sha256::digest(&content.as_bytes()[..end]);
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self(key)
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str, company: &str) -> Chunk {
        Chunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                source: "a.pdf".into(),
                doc_type: "10-K".into(),
                company: company.into(),
                chunk_id: 0,
            },
        }
    }

    #[test]
    fn content_key_ignores_text_after_prefix() {
        let base = "x".repeat(DEDUP_PREFIX_CHARS);
        let a = chunk(&format!("{base}tail one"), "Acme");
        let b = chunk(&format!("{base}something else entirely"), "Acme");
        assert_eq!(a.content_key(), b.content_key());
    }

    #[test]
    fn content_key_differs_within_prefix() {
        assert_ne!(ContentKey::of("revenue grew"), ContentKey::of("revenue fell"));
    }

    #[test]
    fn content_key_counts_characters_not_bytes() {
        let base = "é".repeat(DEDUP_PREFIX_CHARS);
        assert_eq!(ContentKey::of(&format!("{base}a")), ContentKey::of(&format!("{base}b")));
        let short = "é".repeat(DEDUP_PREFIX_CHARS - 1);
        assert_ne!(ContentKey::of(&format!("{short}a")), ContentKey::of(&format!("{short}b")));
    }

    #[test]
    fn company_match_is_case_insensitive() {
        let c = chunk("text", "Acme");
        assert!(c.belongs_to("ACME"));
        assert!(c.belongs_to("acme"));
        assert!(!c.belongs_to("Acme Corp"));
    }

    #[test]
    fn metadata_serializes_type_key() {
        let value = serde_json::to_value(chunk("t", "Acme").metadata).unwrap();
        assert_eq!(value["type"], "10-K");
        assert_eq!(value["chunk_id"], 0);
    }
}

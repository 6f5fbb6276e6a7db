//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! splits hierarchically by paragraphs, lines, words, then characters and
//! merges the pieces back into overlapping windows.

use std::collections::VecDeque;

use crate::document::{Chunk, ChunkMetadata, Document};

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text. Every chunk
    /// inherits the document's provenance and gets a zero-based `chunk_id`.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Separators tried in order, from coarsest to finest.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits text hierarchically: paragraphs → lines → words → characters.
///
/// Sizes are measured in characters. A piece longer than `chunk_size` is split
/// again with the next separator; adjacent small pieces are merged until the
/// window is full, and consecutive windows share up to `chunk_overlap`
/// characters of trailing pieces.
///
/// # Example
///
/// ```rust,ignore
/// use analyst_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }

    /// Split raw text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // Use the first separator that actually occurs; "" always matches.
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
        } else {
            text.split(separator).filter(|s| !s.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }
        chunks
    }

    /// Merge small pieces into windows of at most `chunk_size` characters.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { sep_len };
            if total + len + joiner > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window, separator);
                // Drop leading pieces until only the overlap remains and the
                // next piece fits.
                loop {
                    let joiner = if window.is_empty() { 0 } else { sep_len };
                    let overflows = total > 0 && total + len + joiner > self.chunk_size;
                    if total <= self.chunk_overlap && !overflows {
                        break;
                    }
                    let Some(first) = window.pop_front() else { break };
                    let joined = if window.is_empty() { 0 } else { sep_len };
                    total = total.saturating_sub(char_len(first) + joined);
                }
            }
            if !window.is_empty() {
                total += sep_len;
            }
            window.push_back(piece);
            total += len;
        }
        push_joined(&mut chunks, &window, separator);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }

        self.split_text(&document.text)
            .into_iter()
            .enumerate()
            .map(|(chunk_id, content)| Chunk {
                content,
                metadata: ChunkMetadata {
                    source: document.source.clone(),
                    doc_type: document.doc_type.clone(),
                    company: document.company.clone(),
                    chunk_id,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("reports/acme.pdf", text, "10-K", "Acme")
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        assert!(RecursiveChunker::default().chunk(&doc("")).is_empty());
    }

    #[test]
    fn short_document_is_a_single_chunk() {
        let chunks = RecursiveChunker::new(100, 10).chunk(&doc("Revenue grew 12%."));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Revenue grew 12%.");
        assert_eq!(chunks[0].metadata.company, "Acme");
        assert_eq!(chunks[0].metadata.doc_type, "10-K");
        assert_eq!(chunks[0].metadata.chunk_id, 0);
    }

    #[test]
    fn paragraphs_are_split_before_words() {
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = RecursiveChunker::new(40, 0).split_text(&text);
        assert_eq!(chunks, vec!["a".repeat(30), "b".repeat(30)]);
    }

    #[test]
    fn chunks_respect_size_and_ids_are_sequential() {
        let text = "word ".repeat(400);
        let chunks = RecursiveChunker::new(50, 10).chunk(&doc(&text));
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert!(chunk.content.chars().count() <= 50);
            assert_eq!(chunk.metadata.chunk_id, i);
        }
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let text = (0..40).map(|i| format!("w{i:02}")).collect::<Vec<_>>().join(" ");
        let chunks = RecursiveChunker::new(20, 8).split_text(&text);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0], "w00 w01 w02 w03 w04");
        assert!(chunks[1].starts_with("w03 w04"));
    }

    #[test]
    fn long_unbroken_text_splits_on_characters() {
        let text = "é".repeat(25);
        let chunks = RecursiveChunker::new(10, 0).split_text(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }
}

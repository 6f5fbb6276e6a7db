//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use analyst_rag::{
    AnswerGenerator, Chunk, ChunkMetadata, EmbeddingIndex, MetadataFilter, RagError, Result,
    SearchResult,
};
use async_trait::async_trait;

pub fn chunk(content: &str, company: &str, chunk_id: usize) -> Chunk {
    Chunk {
        content: content.to_string(),
        metadata: ChunkMetadata {
            source: format!("{}.pdf", company.to_lowercase()),
            doc_type: "10-K".to_string(),
            company: company.to_string(),
            chunk_id,
        },
    }
}

/// An index whose results are scripted per query string.
///
/// Queries without a script fall back to `default`. Every call is recorded.
#[derive(Default)]
pub struct ScriptedIndex {
    scripts: HashMap<String, Vec<Chunk>>,
    default: Vec<Chunk>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, query: &str, chunks: Vec<Chunk>) -> Self {
        self.scripts.insert(query.to_string(), chunks);
        self
    }

    pub fn default_results(mut self, chunks: Vec<Chunk>) -> Self {
        self.default = chunks;
        self
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingIndex for ScriptedIndex {
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        self.calls.lock().unwrap().push((query.to_string(), k));
        let chunks = self.scripts.get(query).unwrap_or(&self.default);
        let total = chunks.len().max(1) as f32;
        Ok(chunks
            .iter()
            .filter(|c| filter.is_none_or(|f| f.matches(&c.metadata)))
            .take(k)
            .enumerate()
            .map(|(i, c)| SearchResult { chunk: c.clone(), score: 1.0 - i as f32 / total })
            .collect())
    }
}

/// An index that has never been built.
pub struct UnbuiltIndex;

#[async_trait]
impl EmbeddingIndex for UnbuiltIndex {
    async fn search(
        &self,
        _query: &str,
        _k: usize,
        _filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        Err(RagError::NotInitialized)
    }
}

/// A generator that records prompts and returns a fixed reply or failure.
pub struct FakeGenerator {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn replying(text: &str) -> Self {
        Self { reply: Ok(text.to_string()), prompts: Mutex::default(), calls: AtomicUsize::new(0) }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Mutex::default(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AnswerGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(|message| RagError::GeneratorError {
            provider: "fake".to_string(),
            message,
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

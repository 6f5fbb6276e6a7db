//! Caller-owned session state: loaded documents, accumulated chunks, query
//! quota, and conversation history.
//!
//! Nothing here is global. A front end keeps one [`AnalystSession`] per user
//! and passes it by reference into every operation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::analyst::{Answer, FinancialAnalyst};
use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::AnalystConfig;
use crate::document::{Chunk, Document};
use crate::entities::EntityVocabulary;
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryIndex;

/// A fixed number of queries per rolling window.
///
/// The counter resets on the first check after the window has elapsed.
#[derive(Debug, Clone)]
pub struct QueryQuota {
    limit: u32,
    window: TimeDelta,
    used: u32,
    window_start: DateTime<Utc>,
}

impl QueryQuota {
    /// Create a quota of `limit` queries per `window`, starting at `now`.
    pub fn new(limit: u32, window: TimeDelta, now: DateTime<Utc>) -> Self {
        Self { limit, window, used: 0, window_start: now }
    }

    /// Admit one query at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RateLimited`] when the quota is used up.
    pub fn try_acquire(&mut self, now: DateTime<Utc>) -> Result<()> {
        if now - self.window_start > self.window {
            self.used = 0;
            self.window_start = now;
        }
        if self.used >= self.limit {
            return Err(RagError::RateLimited {
                limit: self.limit,
                window_secs: self.window.num_seconds().max(0) as u64,
            });
        }
        self.used += 1;
        Ok(())
    }

    /// Queries admitted in the current window.
    pub fn used(&self) -> u32 {
        self.used
    }

    /// Queries still available in the current window.
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }
}

/// A document handed to the session for ingestion.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    /// File name, used for duplicate detection and company tagging.
    pub file_name: String,
    /// Extracted text.
    pub text: String,
    /// Document type tag.
    pub doc_type: String,
    /// Explicit company tag; derived from the file name when absent.
    pub company: Option<String>,
    /// Size of the original file in bytes.
    pub size_bytes: usize,
}

impl DocumentUpload {
    /// An upload of already-extracted text, sized by the text itself.
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            file_name: file_name.into(),
            size_bytes: text.len(),
            text,
            doc_type: "Financial Report".to_string(),
            company: None,
        }
    }

    /// Set the document type tag.
    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = doc_type.into();
        self
    }

    /// Set the company tag explicitly.
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Override the reported file size.
    pub fn with_size_bytes(mut self, size_bytes: usize) -> Self {
        self.size_bytes = size_bytes;
        self
    }
}

/// Result of ingesting one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// New chunks were added for `company`.
    Processed {
        /// The company the chunks were tagged with.
        company: String,
        /// Number of chunks produced.
        chunk_count: usize,
    },
    /// A file with the same name was already loaded.
    AlreadyLoaded,
}

/// One answered question.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    /// The question as asked.
    pub question: String,
    /// The answer payload.
    pub answer: Answer,
    /// When the question was asked.
    pub asked_at: DateTime<Utc>,
}

/// Chunk counts over the accumulated corpus.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CorpusSummary {
    /// Total number of chunks.
    pub total_chunks: usize,
    /// Chunks per company tag.
    pub chunks_by_company: BTreeMap<String, usize>,
    /// Chunks per document type.
    pub chunks_by_type: BTreeMap<String, usize>,
    /// Distinct source file names.
    pub sources: BTreeSet<String>,
}

/// Build the question used for a two-company comparison.
pub fn comparison_question(first: &str, second: &str, metric: &str) -> String {
    format!("Compare {first} and {second} in terms of {metric}. Be specific.")
}

/// State for one user of the analyst.
pub struct AnalystSession {
    config: AnalystConfig,
    vocabulary: EntityVocabulary,
    chunker: RecursiveChunker,
    loaded_files: BTreeSet<String>,
    chunks: Vec<Chunk>,
    history: Vec<HistoryEntry>,
    quota: QueryQuota,
    documents_processed: usize,
    queries_asked: usize,
    started_at: DateTime<Utc>,
}

impl AnalystSession {
    /// Start a session with the given configuration and vocabulary.
    pub fn new(config: AnalystConfig, vocabulary: EntityVocabulary) -> Self {
        let now = Utc::now();
        Self {
            chunker: RecursiveChunker::new(config.chunk_size, config.chunk_overlap),
            quota: Self::quota_for(&config, now),
            config,
            vocabulary,
            loaded_files: BTreeSet::new(),
            chunks: Vec::new(),
            history: Vec::new(),
            documents_processed: 0,
            queries_asked: 0,
            started_at: now,
        }
    }

    fn quota_for(config: &AnalystConfig, now: DateTime<Utc>) -> QueryQuota {
        // Out-of-range windows saturate; the quota then never resets.
        let window = i64::try_from(config.quota_window_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        QueryQuota::new(config.queries_per_window, window, now)
    }

    /// Chunk an upload and add it to the corpus.
    ///
    /// The index is not touched; call [`rebuild_index`](Self::rebuild_index)
    /// once a batch of uploads is in.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentRejected`] if the file exceeds the size
    /// limit or yields no chunks.
    pub fn ingest(&mut self, upload: DocumentUpload) -> Result<IngestOutcome> {
        if self.loaded_files.contains(&upload.file_name) {
            info!(file = %upload.file_name, "document already loaded, skipping");
            return Ok(IngestOutcome::AlreadyLoaded);
        }
        if upload.size_bytes > self.config.max_document_bytes {
            warn!(file = %upload.file_name, size_bytes = upload.size_bytes, "document too large");
            return Err(RagError::DocumentRejected {
                name: upload.file_name,
                reason: "file too large".to_string(),
            });
        }

        let company = upload
            .company
            .unwrap_or_else(|| self.vocabulary.company_from_filename(&upload.file_name));
        let document =
            Document::new(upload.file_name.clone(), upload.text, upload.doc_type, company.clone());
        let chunks = self.chunker.chunk(&document);
        if chunks.is_empty() {
            warn!(file = %upload.file_name, "no text extracted");
            return Err(RagError::DocumentRejected {
                name: upload.file_name,
                reason: "no text extracted".to_string(),
            });
        }

        let chunk_count = chunks.len();
        self.chunks.extend(chunks);
        self.loaded_files.insert(upload.file_name.clone());
        self.documents_processed += 1;
        info!(file = %upload.file_name, company = %company, chunk_count, "document ingested");
        Ok(IngestOutcome::Processed { company, chunk_count })
    }

    /// Rebuild `index` from every chunk accumulated so far.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyCorpus`] if nothing has been ingested, or the
    /// embedder's error.
    pub async fn rebuild_index(&self, index: &InMemoryIndex) -> Result<usize> {
        index.rebuild(self.chunks.clone()).await
    }

    /// Admit, answer, and record a question.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RateLimited`] when the quota is exhausted, and
    /// propagates retrieval errors from [`FinancialAnalyst::analyze`].
    pub async fn ask(
        &mut self,
        analyst: &FinancialAnalyst,
        question: &str,
        entities: Option<&[String]>,
    ) -> Result<Answer> {
        let now = Utc::now();
        if let Err(e) = self.quota.try_acquire(now) {
            warn!(used = self.quota.used(), "query quota exhausted");
            return Err(e);
        }
        self.queries_asked += 1;

        let answer = analyst.analyze(question, entities).await?;
        self.history.push(HistoryEntry {
            question: question.to_string(),
            answer: answer.clone(),
            asked_at: now,
        });
        Ok(answer)
    }

    /// Compare two companies on a metric using balanced retrieval.
    ///
    /// # Errors
    ///
    /// Same as [`ask`](Self::ask).
    pub async fn compare(
        &mut self,
        analyst: &FinancialAnalyst,
        first: &str,
        second: &str,
        metric: &str,
    ) -> Result<Answer> {
        let question = comparison_question(first, second, metric);
        let entities = [first.to_string(), second.to_string()];
        self.ask(analyst, &question, Some(&entities)).await
    }

    /// Chunk counts by company and type, plus distinct source files.
    pub fn corpus_summary(&self) -> CorpusSummary {
        let mut summary = CorpusSummary { total_chunks: self.chunks.len(), ..Default::default() };
        for chunk in &self.chunks {
            let meta = &chunk.metadata;
            *summary.chunks_by_company.entry(meta.company.clone()).or_default() += 1;
            *summary.chunks_by_type.entry(meta.doc_type.clone()).or_default() += 1;
            let file = Path::new(&meta.source)
                .file_name()
                .map_or_else(|| meta.source.clone(), |f| f.to_string_lossy().into_owned());
            summary.sources.insert(file.strip_prefix("temp_").unwrap_or(&file).to_string());
        }
        summary
    }

    /// Render the conversation as a plain-text report.
    pub fn render_report(&self, now: DateTime<Utc>) -> String {
        let rule = "=".repeat(60);
        let mut report = String::new();
        let _ = writeln!(report, "AI FINANCIAL ANALYST - CONVERSATION REPORT");
        let _ = writeln!(report, "{rule}\n");
        let _ = writeln!(report, "Generated: {}", now.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(report, "Total Questions: {}\n", self.history.len());

        for (i, entry) in self.history.iter().enumerate() {
            let _ = writeln!(report, "\n{rule}");
            let _ = writeln!(
                report,
                "QUESTION {} (Asked at: {})",
                i + 1,
                entry.asked_at.format("%Y-%m-%d %H:%M:%S")
            );
            let _ = writeln!(report, "{rule}\n");
            let _ = writeln!(report, "Q: {}\n", entry.question);
            let _ = writeln!(report, "A: {}\n", entry.answer.answer);
            let _ = writeln!(report, "SOURCES:");
            for (j, source) in entry.answer.sources.iter().enumerate() {
                let _ = writeln!(report, "\nSource {}:\n{}", j + 1, source.content);
            }
        }
        report
    }

    /// Forget every document, answer, and counter, and unbuild `index`.
    ///
    /// Questions asked afterwards fail with
    /// [`RagError::NotInitialized`] until the index is rebuilt.
    pub async fn reset(&mut self, index: &InMemoryIndex) {
        index.clear().await;
        let now = Utc::now();
        self.loaded_files.clear();
        self.chunks.clear();
        self.history.clear();
        self.quota = Self::quota_for(&self.config, now);
        self.documents_processed = 0;
        self.queries_asked = 0;
        self.started_at = now;
        info!("session reset");
    }

    /// Accumulated chunks, in ingestion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Names of loaded files.
    pub fn loaded_files(&self) -> &BTreeSet<String> {
        &self.loaded_files
    }

    /// Answered questions, oldest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Clear the conversation history only.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// The query quota.
    pub fn quota(&self) -> &QueryQuota {
        &self.quota
    }

    /// Documents ingested since the session started.
    pub fn documents_processed(&self) -> usize {
        self.documents_processed
    }

    /// Questions admitted since the session started.
    pub fn queries_asked(&self) -> usize {
        self.queries_asked
    }

    /// When the session started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

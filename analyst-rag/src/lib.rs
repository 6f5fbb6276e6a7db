//! # analyst-rag
//!
//! Retrieval-augmented question answering over financial documents.
//!
//! Documents are chunked, embedded into an in-memory index, and questions are
//! answered by retrieving chunks and handing them to a language model. The
//! interesting part is retrieval: [`RetrievalOrchestrator`] issues several
//! searches per question, drops chunks whose first 200 characters were
//! already seen, and for comparative questions can give every named company
//! its own search budget.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use analyst_rag::{
//!     AnalystConfig, AnalystSession, DocumentUpload, EntityVocabulary, FinancialAnalyst,
//!     HashingEmbeddingProvider, InMemoryIndex,
//! };
//!
//! let config = AnalystConfig::default();
//! let mut session = AnalystSession::new(config.clone(), EntityVocabulary::default());
//! session.ingest(DocumentUpload::new("10-K ACME.pdf", text).with_company("Acme"))?;
//!
//! let index = Arc::new(InMemoryIndex::new(Arc::new(HashingEmbeddingProvider::new(512)?)));
//! session.rebuild_index(&index).await?;
//!
//! let analyst = FinancialAnalyst::builder()
//!     .config(config)
//!     .index(index)
//!     .generator(Arc::new(my_generator))
//!     .build()?;
//! let answer = session.ask(&analyst, "How did Acme's margin develop?", None).await?;
//! ```
//!
//! ## Features
//!
//! - `openai`: [`openai::OpenAIEmbeddingProvider`] and
//!   [`openai::OpenAIChatGenerator`]

pub mod analyst;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod entities;
pub mod error;
pub mod generator;
pub mod inmemory;
pub mod orchestrator;
pub mod session;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;

pub use analyst::{
    Answer, AnswerOutcome, FinancialAnalyst, FinancialAnalystBuilder, NO_RELEVANT_INFORMATION,
    SourceCitation, format_context, render_prompt,
};
pub use chunking::{Chunker, RecursiveChunker};
pub use config::{AnalystConfig, AnalystConfigBuilder};
pub use document::{Chunk, ChunkMetadata, ContentKey, DEDUP_PREFIX_CHARS, Document, SearchResult};
pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider};
pub use entities::{CompanyEntry, EntityVocabulary};
pub use error::{RagError, Result};
pub use generator::AnswerGenerator;
pub use inmemory::InMemoryIndex;
pub use orchestrator::{Retrieval, RetrievalMode, RetrievalOrchestrator};
pub use session::{
    AnalystSession, CorpusSummary, DocumentUpload, HistoryEntry, IngestOutcome, QueryQuota,
    comparison_question,
};
pub use vectorstore::{EmbeddingIndex, MetadataFilter};

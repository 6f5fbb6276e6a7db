//! Question answering over retrieved chunks.
//!
//! [`FinancialAnalyst`] runs retrieval through a [`RetrievalOrchestrator`],
//! renders the chunks into a prompt, and asks an [`AnswerGenerator`] for the
//! analysis. Its result is always a well-formed [`Answer`] except when
//! retrieval itself fails:
//!
//! - nothing retrieved → a canned "no relevant information" answer, and the
//!   generator is not called;
//! - generator failure → the error text becomes the answer.
//!
//! # Example
//!
//! ```rust,ignore
//! use analyst_rag::{FinancialAnalyst, InMemoryIndex};
//!
//! let analyst = FinancialAnalyst::builder()
//!     .index(index.clone())
//!     .generator(Arc::new(my_llm))
//!     .build()?;
//!
//! let answer = analyst.analyze("What drove Acme's revenue?", None).await?;
//! println!("{}", answer.answer);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AnalystConfig;
use crate::document::{Chunk, ChunkMetadata};
use crate::entities::EntityVocabulary;
use crate::error::{RagError, Result};
use crate::generator::AnswerGenerator;
use crate::orchestrator::{Retrieval, RetrievalOrchestrator};
use crate::vectorstore::EmbeddingIndex;

/// Answer text used when retrieval finds nothing.
pub const NO_RELEVANT_INFORMATION: &str =
    "I couldn't find relevant information in the uploaded documents.";

const PROMPT_TEMPLATE: &str = "You are an expert financial analyst. Analyze the provided context \
from financial documents to answer the question thoroughly.

CRITICAL INSTRUCTIONS:
1. **Use ALL relevant information from the context**
2. **For comparative questions**: Provide details for EACH company mentioned
3. **Cite specific numbers and data points**
4. **Structure comparative answers** with clear sections for each company
5. **If data is missing**: Explicitly state what's missing
6. **Always attempt an answer** based on available context

CONTEXT FROM FINANCIAL DOCUMENTS:
{context}

QUESTION: {question}

DETAILED ANALYSIS:";

/// How an [`Answer`] came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// The generator produced the answer text.
    Generated,
    /// Retrieval found nothing; the answer is a fixed notice.
    NoRelevantInformation,
    /// The generator failed; the answer is the error description.
    GeneratorFailed,
}

/// A shortened chunk shown alongside an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceCitation {
    /// Leading characters of the chunk content, followed by `...`.
    pub content: String,
    /// Provenance of the cited chunk.
    pub metadata: ChunkMetadata,
}

impl SourceCitation {
    fn from_chunk(chunk: &Chunk, preview_chars: usize) -> Self {
        let mut content: String = chunk.content.chars().take(preview_chars).collect();
        content.push_str("...");
        Self { content, metadata: chunk.metadata.clone() }
    }
}

/// The final answer payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// Free-text analysis, notice, or error description.
    pub answer: String,
    /// Citations for the leading retrieved chunks.
    pub sources: Vec<SourceCitation>,
    /// How the answer was produced.
    pub outcome: AnswerOutcome,
}

impl Answer {
    fn no_relevant_information() -> Self {
        Self {
            answer: NO_RELEVANT_INFORMATION.to_string(),
            sources: Vec::new(),
            outcome: AnswerOutcome::NoRelevantInformation,
        }
    }
}

/// Render chunks as the numbered context block of the prompt.
pub fn format_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[Document {} - {} - {}]:\n{}\n",
                i + 1,
                chunk.metadata.company,
                chunk.metadata.doc_type,
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Fill the analyst prompt template.
pub fn render_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE.replace("{context}", context).replace("{question}", question)
}

/// Retrieval plus answer generation.
///
/// Construct one via [`FinancialAnalyst::builder()`].
pub struct FinancialAnalyst {
    config: AnalystConfig,
    orchestrator: RetrievalOrchestrator,
    generator: Arc<dyn AnswerGenerator>,
}

impl FinancialAnalyst {
    /// Create a new [`FinancialAnalystBuilder`].
    pub fn builder() -> FinancialAnalystBuilder {
        FinancialAnalystBuilder::default()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &AnalystConfig {
        &self.config
    }

    /// Return a reference to the retrieval orchestrator.
    pub fn orchestrator(&self) -> &RetrievalOrchestrator {
        &self.orchestrator
    }

    /// Answer `question`, forcing balanced retrieval when two or more
    /// `entities` are given.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotInitialized`] if the index has not been built,
    /// and propagates other index failures. Generator failures are not
    /// errors; see [`AnswerOutcome::GeneratorFailed`].
    pub async fn analyze(&self, question: &str, entities: Option<&[String]>) -> Result<Answer> {
        let retrieval = self.orchestrator.retrieve(question, entities).await?;
        if retrieval.is_empty() {
            info!(mode = ?retrieval.mode, "no relevant chunks, skipping generation");
            return Ok(Answer::no_relevant_information());
        }
        Ok(self.answer_from(question, &retrieval).await)
    }

    async fn answer_from(&self, question: &str, retrieval: &Retrieval) -> Answer {
        let context = format_context(&retrieval.chunks);
        let prompt = render_prompt(&context, question);

        match self.generator.generate(&prompt).await {
            Ok(text) => {
                let sources: Vec<SourceCitation> = retrieval
                    .chunks
                    .iter()
                    .take(self.config.max_citations)
                    .map(|c| SourceCitation::from_chunk(c, self.config.citation_preview_chars))
                    .collect();
                info!(
                    generator = self.generator.name(),
                    chunk_count = retrieval.chunks.len(),
                    source_count = sources.len(),
                    "answer generated"
                );
                Answer { answer: text, sources, outcome: AnswerOutcome::Generated }
            }
            Err(e) => {
                warn!(generator = self.generator.name(), error = %e, "answer generation failed");
                Answer {
                    answer: format!("Error: {e}"),
                    sources: Vec::new(),
                    outcome: AnswerOutcome::GeneratorFailed,
                }
            }
        }
    }
}

/// Builder for constructing a [`FinancialAnalyst`].
///
/// `index` and `generator` are required; configuration and vocabulary fall
/// back to their defaults.
#[derive(Default)]
pub struct FinancialAnalystBuilder {
    config: Option<AnalystConfig>,
    vocabulary: Option<EntityVocabulary>,
    index: Option<Arc<dyn EmbeddingIndex>>,
    generator: Option<Arc<dyn AnswerGenerator>>,
}

impl FinancialAnalystBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: AnalystConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the entity vocabulary used for query expansion.
    pub fn vocabulary(mut self, vocabulary: EntityVocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    /// Set the embedding index to search.
    pub fn index(mut self, index: Arc<dyn EmbeddingIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the [`FinancialAnalyst`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or
    /// the configuration is invalid.
    pub fn build(self) -> Result<FinancialAnalyst> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let index =
            self.index.ok_or_else(|| RagError::ConfigError("index is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;
        let vocabulary = self.vocabulary.unwrap_or_default();

        Ok(FinancialAnalyst {
            orchestrator: RetrievalOrchestrator::new(index, vocabulary, config.clone()),
            config,
            generator,
        })
    }
}

//! Error types for the `analyst-rag` crate.

use thiserror::Error;

/// Errors that can occur while indexing, retrieving, or answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding index has not been built yet.
    #[error("Embedding index not initialized: ingest documents before querying")]
    NotInitialized,

    /// An index rebuild was requested with no chunks to index.
    #[error("No chunks provided to build the embedding index")]
    EmptyCorpus,

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The answer generator failed to produce text.
    #[error("Generator error ({provider}): {message}")]
    GeneratorError {
        /// The generator backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The per-session query quota is exhausted for the current window.
    #[error("Rate limit reached ({limit} queries per {window_secs}s), try again later")]
    RateLimited {
        /// Maximum number of queries per window.
        limit: u32,
        /// Length of the quota window in seconds.
        window_secs: u64,
    },

    /// A document was refused at ingestion time.
    #[error("Document '{name}' rejected: {reason}")]
    DocumentRejected {
        /// The file name of the rejected document.
        name: String,
        /// Why the document was refused.
        reason: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A convenience result type for analyst operations.
pub type Result<T> = std::result::Result<T, RagError>;

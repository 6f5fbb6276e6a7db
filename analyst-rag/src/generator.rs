//! Answer generator trait.

use async_trait::async_trait;

use crate::error::Result;

/// A language model that turns a fully rendered prompt into free text.
///
/// The output has no structural contract; callers display it as-is.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GeneratorError`](crate::RagError::GeneratorError)
    /// when the provider call fails.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// A short provider name for logs.
    fn name(&self) -> &str {
        "generator"
    }
}

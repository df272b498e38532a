//! Completion provider abstraction.

use crate::error::ProviderError;

/// A single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// User prompt.
    pub prompt: String,
}

/// External text-generation provider.
///
/// Calls are synchronous; async callers run them on the blocking pool.
pub trait CompletionProvider: Send + Sync {
    /// Run one completion and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport failure, an error status, or a
    /// response without text. Overload is distinguished by
    /// [`ProviderError::is_overloaded`].
    fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

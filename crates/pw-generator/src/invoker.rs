//! Generation invoker with bounded overload retry.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{GenerationError, ProviderError};
use crate::provider::{CompletionProvider, CompletionRequest};

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

/// Per-call generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    /// Model identifier.
    pub model: String,
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait between attempts after an overload.
    pub retry_delay: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            max_tokens: 8192,
            temperature: 0.7,
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Calls the completion provider, retrying only on overload.
///
/// The provider call runs on the blocking pool and the wait between attempts
/// is an async sleep, so a retrying request never stalls other requests.
pub struct GenerationInvoker {
    provider: Arc<dyn CompletionProvider>,
    settings: GenerationSettings,
}

impl GenerationInvoker {
    /// Create an invoker over `provider`.
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    /// Settings used for every call.
    #[must_use]
    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Generate raw model text for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Exhausted`] when every attempt was
    /// overloaded, or [`GenerationError::Provider`] on the first
    /// non-retryable provider error.
    pub async fn invoke(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = Arc::new(CompletionRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            prompt: prompt.to_owned(),
        });
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.call(Arc::clone(&request)).await? {
                Ok(text) => {
                    info!(attempt, chars = text.len(), "Generation succeeded");
                    return Ok(text);
                }
                Err(err) if err.is_overloaded() && attempt < max_attempts => {
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(self.settings.retry_delay.as_millis())
                            .unwrap_or(u64::MAX),
                        "Provider overloaded, retrying"
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                    attempt += 1;
                }
                Err(err) if err.is_overloaded() => {
                    warn!(attempts = attempt, "Provider still overloaded, giving up");
                    return Err(GenerationError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => return Err(GenerationError::Provider(err)),
            }
        }
    }

    async fn call(
        &self,
        request: Arc<CompletionRequest>,
    ) -> Result<Result<String, ProviderError>, GenerationError> {
        let provider = Arc::clone(&self.provider);
        Ok(tokio::task::spawn_blocking(move || provider.complete(&request)).await?)
    }
}

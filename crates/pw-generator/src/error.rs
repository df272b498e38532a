//! Error types for text generation.

/// HTTP status the provider uses to report overload.
const OVERLOADED_STATUS: u16 = 529;

/// Error type the provider uses to report overload.
const OVERLOADED_TYPE: &str = "overloaded_error";

/// Error from a single provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed (network error, timeout, etc).
    #[error("HTTP request failed")]
    HttpRequest(#[from] ureq::Error),

    /// Provider returned an error status.
    #[error("provider error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error type (e.g., "overloaded_error").
        error_type: Option<String>,
        /// Error message or raw response body.
        message: String,
    },

    /// Response body was not the expected JSON.
    #[error("invalid provider response")]
    Json(#[from] serde_json::Error),

    /// Response contained no text blocks.
    #[error("provider response contained no text")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether the provider reported a transient overload.
    #[must_use]
    pub fn is_overloaded(&self) -> bool {
        match self {
            Self::Api {
                status, error_type, ..
            } => *status == OVERLOADED_STATUS || error_type.as_deref() == Some(OVERLOADED_TYPE),
            _ => false,
        }
    }

    /// Overload error as the provider reports it.
    #[must_use]
    pub fn overloaded() -> Self {
        Self::Api {
            status: OVERLOADED_STATUS,
            error_type: Some(OVERLOADED_TYPE.to_owned()),
            message: "Overloaded".to_owned(),
        }
    }
}

/// Error from the generation invoker.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Provider stayed overloaded for every attempt.
    #[error("provider overloaded after {attempts} attempts")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        last: ProviderError,
    },

    /// Provider failed with a non-retryable error.
    #[error("generation failed: {0}")]
    Provider(#[source] ProviderError),

    /// Blocking provider task did not complete.
    #[error("generation task failed")]
    Task(#[from] tokio::task::JoinError),
}

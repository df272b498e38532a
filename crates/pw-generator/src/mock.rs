//! Scripted provider for testing.
//!
//! Provides [`ScriptedProvider`], which replays a fixed sequence of replies and
//! records every request it receives.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::ProviderError;
use crate::provider::{CompletionProvider, CompletionRequest};

/// One scripted reply.
#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Overloaded,
    Failure { status: u16, message: String },
}

/// Provider that replays scripted replies in order.
///
/// Once the script is exhausted every call fails with a 500 error.
///
/// # Example
///
/// ```ignore
/// use pw_generator::ScriptedProvider;
///
/// let provider = ScriptedProvider::new()
///     .then_overloaded()
///     .then_text("<!DOCTYPE html><html></html>");
/// ```
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    /// Create a provider with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a successful reply.
    #[must_use]
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.push(Reply::Text(text.into()))
    }

    /// Append an overload reply.
    #[must_use]
    pub fn then_overloaded(self) -> Self {
        self.push(Reply::Overloaded)
    }

    /// Append a non-retryable error reply.
    #[must_use]
    pub fn then_failure(self, status: u16, message: impl Into<String>) -> Self {
        self.push(Reply::Failure {
            status,
            message: message.into(),
        })
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    fn push(self, reply: Reply) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
        self
    }
}

impl CompletionProvider for ScriptedProvider {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front());

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Overloaded) => Err(ProviderError::overloaded()),
            Some(Reply::Failure { status, message }) => Err(ProviderError::Api {
                status,
                error_type: Some("api_error".to_owned()),
                message,
            }),
            None => Err(ProviderError::Api {
                status: 500,
                error_type: None,
                message: "script exhausted".to_owned(),
            }),
        }
    }
}

//! Anthropic Messages API client.
//!
//! Provides a sync HTTP client that sends one user message per completion and
//! concatenates the text blocks of the reply.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use ureq::Agent;

use crate::error::ProviderError;
use crate::provider::{CompletionProvider, CompletionRequest};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value.
const API_VERSION: &str = "2023-06-01";

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 120;

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    agent: Agent,
    base_url: String,
    api_key: String,
}

impl AnthropicClient {
    /// Create a client with the default base URL and timeout.
    #[must_use]
    pub fn new(api_key: &str) -> Self {
        Self::from_config(
            api_key,
            DEFAULT_BASE_URL,
            Duration::from_secs(DEFAULT_TIMEOUT),
        )
    }

    /// Create a client from config values.
    ///
    /// # Arguments
    /// * `api_key` - Provider API key
    /// * `base_url` - API base URL (without `/v1`)
    /// * `timeout` - Per-request HTTP timeout
    #[must_use]
    pub fn from_config(api_key: &str, base_url: &str, timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

impl CompletionProvider for AnthropicClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let payload = serde_json::to_vec(&MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
        })?;

        debug!(
            model = %request.model,
            prompt_len = request.prompt.len(),
            "Sending completion request"
        );

        let response = self
            .agent
            .post(&self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload[..])?;

        let status = response.status().as_u16();
        let mut body_reader = response.into_body();

        if status >= 400 {
            let error_body = body_reader
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_owned());
            return Err(parse_error(status, &error_body));
        }

        let body = body_reader.read_to_string()?;
        collect_text(&body)
    }
}

/// Build an API error from an error response body.
fn parse_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => ProviderError::Api {
            status,
            error_type: Some(parsed.error.kind),
            message: parsed.error.message,
        },
        Err(_) => ProviderError::Api {
            status,
            error_type: None,
            message: body.to_owned(),
        },
    }
}

/// Concatenate the text blocks of a successful response.
fn collect_text(body: &str) -> Result<String, ProviderError> {
    let response: MessagesResponse = serde_json::from_str(body)?;
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(text)
}

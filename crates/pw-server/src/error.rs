//! Error types for the HTTP server.

use std::error::Error;
use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pw_config::ConfigError;
use pw_pages::PageError;
use pw_storage::StorageError;
use serde_json::{Value, json};

/// Error returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ServerError {
    /// Pipeline or storage failure.
    #[error(transparent)]
    Page(#[from] PageError),

    /// Request body or query could not be decoded.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Generation exceeded the request timeout.
    #[error("Generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Generate task panicked or was cancelled.
    #[error("Generation task failed: {0}")]
    Task(tokio::task::JoinError),
}

impl ServerError {
    fn status_and_body(&self) -> (StatusCode, Value) {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, failure(message, None)),
            Self::Timeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                failure(&self.to_string(), None),
            ),
            Self::Task(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                failure("Page generation failed", Some(e.to_string())),
            ),
            Self::Page(PageError::Validation(message)) => {
                (StatusCode::BAD_REQUEST, failure(message, None))
            }
            Self::Page(PageError::NotFound(key)) => (
                StatusCode::NOT_FOUND,
                failure("Page not found", Some(key.clone())),
            ),
            Self::Page(PageError::Generation(e)) => (
                StatusCode::BAD_GATEWAY,
                failure("Page generation failed", Some(error_chain(e))),
            ),
            Self::Page(PageError::Storage(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                failure("Failed to save page", Some(error_chain(e))),
            ),
            Self::Page(PageError::Partial {
                key,
                public_url,
                source,
            }) => {
                let mut body = failure(
                    "Page saved but its metadata could not be written",
                    Some(error_chain(source)),
                );
                body["partial"] = json!(true);
                body["canonicalKey"] = json!(key);
                body["publicUrl"] = json!(public_url);
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }
        (status, Json(body)).into_response()
    }
}

/// Error building the server from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration is incomplete or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Storage backend could not be opened.
    #[error("Failed to open storage: {0}")]
    Storage(#[from] StorageError),
    /// Listener could not be bound or served.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Host and port do not form a socket address.
    #[error("Invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),
}

fn failure(error: &str, details: Option<String>) -> Value {
    let mut body = json!({"success": false, "error": error});
    if let Some(details) = details {
        body["details"] = json!(details);
    }
    body
}

/// Render an error and its sources, skipping sources already quoted by
/// their parent.
fn error_chain(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        let msg = s.to_string();
        if !out.ends_with(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        source = s.source();
    }
    out
}

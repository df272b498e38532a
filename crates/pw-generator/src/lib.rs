//! Text generation for Pagewright.
//!
//! This crate wraps the external completion provider:
//!
//! - [`CompletionProvider`] trait for a single synchronous completion call
//! - [`AnthropicClient`], the Anthropic Messages API implementation
//! - [`GenerationInvoker`], which retries on provider overload
//! - `ScriptedProvider` for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pw_generator::{AnthropicClient, GenerationInvoker, GenerationSettings};
//!
//! let provider = Arc::new(AnthropicClient::new(&api_key));
//! let invoker = GenerationInvoker::new(provider, GenerationSettings::default());
//! let text = invoker.invoke("Create a landing page for a bakery").await?;
//! ```

mod anthropic;
mod error;
mod invoker;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod provider;

pub use anthropic::{AnthropicClient, DEFAULT_BASE_URL};
pub use error::{GenerationError, ProviderError};
pub use invoker::{DEFAULT_MODEL, GenerationInvoker, GenerationSettings};
#[cfg(any(test, feature = "mock"))]
pub use mock::ScriptedProvider;
pub use provider::{CompletionProvider, CompletionRequest};

//! Page generation and publication pipeline for Pagewright.
//!
//! A page request flows through these stages, leaves first:
//!
//! - [`normalize`]: free-form name to canonical storage key
//! - [`fetch_existing`]: currently published body, if any
//! - [`PromptComposer`]: update or create prompt
//! - `GenerationInvoker` (from `pw-generator`): provider call with overload retry
//! - [`extract`]: document isolated from the raw model text
//! - [`Publisher`]: body and metadata written to storage
//!
//! [`PageService`] runs the stages in order and also serves the read side
//! (view, list, delete, health).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pw_pages::{GenerateRequest, PageService, PromptComposer};
//!
//! let service = PageService::new(storage, invoker, PromptComposer::default());
//! let generated = service
//!     .generate(&GenerateRequest {
//!         page_name: "Pricing".to_owned(),
//!         instructions: "A pricing page with three tiers".to_owned(),
//!         sibling_pages: vec!["home".to_owned()],
//!         page_kind: None,
//!     })
//!     .await?;
//! println!("{}", generated.public_url);
//! ```

mod error;
mod extract;
mod fetch;
mod normalize;
mod prompt;
mod publish;
mod service;

pub use error::PageError;
pub use extract::{Extraction, extract};
pub use fetch::fetch_existing;
pub use normalize::normalize;
pub use prompt::{DEFAULT_PAGE_KIND, PromptComposer};
pub use publish::{PublishError, PublishRequest, Published, Publisher};
pub use service::{GenerateRequest, Generated, HealthReport, PageService, PageView};

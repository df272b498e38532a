//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;
use std::time::Duration;

use pw_pages::PageService;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Generation and publication pipeline, shared with detached generate tasks.
    pub(crate) service: Arc<PageService>,
    /// Upper bound on a single generate request.
    pub(crate) request_timeout: Duration,
}

//! HTTP request handlers.

pub(crate) mod generate;
pub(crate) mod health;
pub(crate) mod pages;
pub(crate) mod view;

use serde::Deserialize;

/// Query string for endpoints addressing a single page by name.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageQuery {
    /// Free-form page name; normalized by the service.
    #[serde(default)]
    pub(crate) name: String,
}

/// Viewer address for a canonical key.
pub(crate) fn view_url(canonical_key: &str) -> String {
    format!("/view?page={canonical_key}")
}

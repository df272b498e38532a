//! Object key layout shared by all backends.
//!
//! ```text
//! pages/{canonical_key}.html      # document body
//! metadata/{canonical_key}.json   # metadata sidecar
//! ```

/// Prefix for document bodies.
pub const PAGES_PREFIX: &str = "pages/";
/// Prefix for metadata sidecars.
pub const METADATA_PREFIX: &str = "metadata/";

/// Content type for document bodies.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
/// Content type for metadata sidecars.
pub const JSON_CONTENT_TYPE: &str = "application/json";

const PAGE_EXT: &str = ".html";
const METADATA_EXT: &str = ".json";

/// Object key of the document body for `canonical_key`.
#[must_use]
pub fn page_key(canonical_key: &str) -> String {
    format!("{PAGES_PREFIX}{canonical_key}{PAGE_EXT}")
}

/// Object key of the metadata sidecar for `canonical_key`.
#[must_use]
pub fn metadata_key(canonical_key: &str) -> String {
    format!("{METADATA_PREFIX}{canonical_key}{METADATA_EXT}")
}

/// File name of the document body (e.g., "pricing.html").
#[must_use]
pub fn page_file_name(canonical_key: &str) -> String {
    format!("{canonical_key}{PAGE_EXT}")
}

/// A parsed object key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKey<'a> {
    /// `pages/{key}.html`
    Page(&'a str),
    /// `metadata/{key}.json`
    Metadata(&'a str),
}

impl<'a> ObjectKey<'a> {
    /// Parse an object key. Returns `None` for keys outside the layout.
    #[must_use]
    pub fn parse(key: &'a str) -> Option<Self> {
        if let Some(name) = key
            .strip_prefix(PAGES_PREFIX)
            .and_then(|rest| rest.strip_suffix(PAGE_EXT))
        {
            return (!name.is_empty() && !name.contains('/')).then_some(Self::Page(name));
        }
        key.strip_prefix(METADATA_PREFIX)
            .and_then(|rest| rest.strip_suffix(METADATA_EXT))
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .map(Self::Metadata)
    }

    /// Canonical key of the page this object belongs to.
    #[must_use]
    pub fn canonical_key(self) -> &'a str {
        match self {
            Self::Page(name) | Self::Metadata(name) => name,
        }
    }
}

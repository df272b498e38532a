//! Page metadata sidecar types.
//!
//! Provides the [`PageMetadata`] record stored next to every published page.
//! This module contains only data types; merge rules (when `created_at` is
//! kept) live with the publisher.
//!
//! # Wire Format
//!
//! ```json
//! {
//!   "name": "pricing",
//!   "title": "Pricing Page",
//!   "instructions": "make the header blue",
//!   "createdAt": "2025-01-01T00:00:00Z",
//!   "updatedAt": "2025-01-02T00:00:00Z",
//!   "pageUrl": "https://cdn.example.com/pages/pricing.html",
//!   "fileName": "pricing.html"
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata sidecar describing a published page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    /// Canonical key of the page.
    #[serde(rename = "name")]
    pub canonical_key: String,
    /// Display title as supplied by the caller (unsanitized).
    pub title: String,
    /// Edit request that produced the current body.
    pub instructions: String,
    /// First publish time. Never changes once set.
    pub created_at: DateTime<Utc>,
    /// Most recent publish time.
    pub updated_at: DateTime<Utc>,
    /// Public address of the document body.
    pub page_url: String,
    /// File name of the document body (e.g., "pricing.html").
    #[serde(default)]
    pub file_name: String,
}

impl PageMetadata {
    /// Parse metadata from its JSON encoding.
    pub fn from_json(bytes: &[u8]) -> Result<Self, MetadataError> {
        serde_json::from_slice(bytes).map_err(MetadataError::Parse)
    }

    /// Encode metadata as JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, MetadataError> {
        serde_json::to_vec(self).map_err(MetadataError::Encode)
    }
}

/// Error type for metadata encoding.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// Stored record is not valid metadata JSON.
    #[error("invalid metadata: {0}")]
    Parse(#[source] serde_json::Error),
    /// Record could not be encoded.
    #[error("failed to encode metadata: {0}")]
    Encode(#[source] serde_json::Error),
}

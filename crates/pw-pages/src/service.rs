//! Page service.
//!
//! [`PageService`] wires the pipeline stages together for the write path
//! (normalize, fetch, compose, generate, extract, publish) and serves the read
//! side (view, list, delete, health) from the same storage backend.
//!
//! The service holds no per-request state. It is built once at startup and
//! shared behind an `Arc`.

use std::collections::BTreeSet;
use std::sync::Arc;

use pw_generator::GenerationInvoker;
use pw_storage::layout::{self, ObjectKey};
use pw_storage::{PageMetadata, Storage};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::PageError;
use crate::extract::extract;
use crate::fetch::fetch_existing;
use crate::normalize::normalize;
use crate::prompt::PromptComposer;
use crate::publish::{PublishRequest, Publisher};

/// Input to [`PageService::generate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Free-form page name.
    pub page_name: String,
    /// Requested content or change.
    pub instructions: String,
    /// Other pages to link to.
    pub sibling_pages: Vec<String>,
    /// Page kind for creation prompts; the composer's default when `None`.
    pub page_kind: Option<String>,
}

/// Result of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    /// Canonical key the page was published under.
    pub canonical_key: String,
    /// Public address of the body.
    pub public_url: String,
    /// Published body.
    pub body: String,
    /// Page did not exist before.
    pub created: bool,
    /// Both document markers were found in the model output.
    pub well_formed: bool,
    /// Metadata as written.
    pub metadata: PageMetadata,
}

/// A published page as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    /// Canonical key.
    pub canonical_key: String,
    /// Document body.
    pub body: String,
    /// Metadata, if a readable record exists.
    pub metadata: Option<PageMetadata>,
}

/// Storage health summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Backend identifier.
    pub backend: &'static str,
    /// Stored pages survive a restart.
    pub persistent: bool,
    /// Backend answered the reachability probe.
    pub reachable: bool,
    /// Probe or listing failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Canonical keys with a body but no metadata.
    pub orphaned: Vec<String>,
}

/// Page generation and publication service.
pub struct PageService {
    storage: Arc<dyn Storage>,
    invoker: GenerationInvoker,
    composer: PromptComposer,
    publisher: Publisher,
}

impl PageService {
    /// Create a service over `storage`.
    pub fn new(
        storage: Arc<dyn Storage>,
        invoker: GenerationInvoker,
        composer: PromptComposer,
    ) -> Self {
        let publisher = Publisher::new(Arc::clone(&storage));
        Self {
            storage,
            invoker,
            composer,
            publisher,
        }
    }

    /// Storage backend in use.
    #[must_use]
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Generate (or revise) a page and publish it.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Validation`] for empty input,
    /// [`PageError::Generation`] when the provider fails (nothing is
    /// published), and [`PageError::Storage`] or [`PageError::Partial`] when
    /// publishing fails.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<Generated, PageError> {
        if request.instructions.trim().is_empty() {
            return Err(PageError::Validation("instructions are required".to_owned()));
        }
        let canonical_key = validated_key(&request.page_name)?;

        let existing = fetch_existing(self.storage.as_ref(), &canonical_key).await;
        info!(
            key = %canonical_key,
            mode = if existing.is_some() { "update" } else { "create" },
            "Generating page"
        );

        let prompt = self.composer.compose_as(
            request.page_kind.as_deref(),
            &request.instructions,
            existing.as_deref(),
            &request.sibling_pages,
        );
        let raw = self.invoker.invoke(&prompt).await?;

        let extraction = extract(&raw);
        if !extraction.has_start {
            warn!(key = %canonical_key, "Model output has no <!DOCTYPE html>, publishing as-is");
        } else if !extraction.has_end {
            warn!(key = %canonical_key, "Model output has no closing </html>");
        }

        let published = self
            .publisher
            .publish(PublishRequest {
                canonical_key: &canonical_key,
                title: &request.page_name,
                instructions: &request.instructions,
                body: extraction.body,
            })
            .await?;

        Ok(Generated {
            canonical_key,
            public_url: published.public_url,
            body: extraction.body.to_owned(),
            created: published.created,
            well_formed: extraction.is_well_formed(),
            metadata: published.metadata,
        })
    }

    /// Read a published page by name.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::NotFound`] if no body is stored.
    pub async fn page(&self, name: &str) -> Result<PageView, PageError> {
        let canonical_key = validated_key(name)?;

        let body = match self.storage.get(&layout::page_key(&canonical_key)).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.is_not_found() => return Err(PageError::NotFound(canonical_key)),
            Err(e) => return Err(e.into()),
        };
        let metadata = self.read_metadata(&canonical_key).await;

        Ok(PageView {
            canonical_key,
            body,
            metadata,
        })
    }

    /// List all page metadata, newest first by creation time.
    ///
    /// Unreadable records are skipped.
    pub async fn list(&self) -> Result<Vec<PageMetadata>, PageError> {
        let entries = self.storage.list(layout::METADATA_PREFIX).await?;

        let mut pages = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(ObjectKey::Metadata(name)) = ObjectKey::parse(&entry.key) else {
                continue;
            };
            let bytes = match self.storage.get(&entry.key).await {
                Ok(bytes) => bytes,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            };
            match PageMetadata::from_json(&bytes) {
                Ok(meta) => pages.push(meta),
                Err(e) => warn!(key = %name, error = %e, "Skipping unreadable metadata"),
            }
        }

        pages.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.canonical_key.cmp(&b.canonical_key))
        });
        Ok(pages)
    }

    /// Delete a page and its metadata. Returns the canonical key.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::NotFound`] if neither record exists.
    pub async fn delete(&self, name: &str) -> Result<String, PageError> {
        let canonical_key = validated_key(name)?;
        let page_key = layout::page_key(&canonical_key);
        let meta_key = layout::metadata_key(&canonical_key);

        if !self.exists(&page_key).await? && !self.exists(&meta_key).await? {
            return Err(PageError::NotFound(canonical_key));
        }

        self.storage.delete(&[page_key, meta_key]).await?;
        info!(key = %canonical_key, "Deleted page");
        Ok(canonical_key)
    }

    /// Probe the backend and look for pages missing their metadata.
    pub async fn health(&self) -> HealthReport {
        let mut report = HealthReport {
            backend: self.storage.backend(),
            persistent: self.storage.is_persistent(),
            reachable: false,
            error: None,
            orphaned: Vec::new(),
        };

        if let Err(e) = self.storage.check().await {
            warn!(error = %e, "Storage health check failed");
            report.error = Some(e.to_string());
            return report;
        }
        report.reachable = true;

        match self.orphaned().await {
            Ok(orphaned) => report.orphaned = orphaned,
            Err(e) => report.error = Some(e.to_string()),
        }
        report
    }

    async fn orphaned(&self) -> Result<Vec<String>, pw_storage::StorageError> {
        let with_metadata: BTreeSet<String> = self
            .storage
            .list(layout::METADATA_PREFIX)
            .await?
            .iter()
            .filter_map(|e| ObjectKey::parse(&e.key).map(|k| k.canonical_key().to_owned()))
            .collect();

        Ok(self
            .storage
            .list(layout::PAGES_PREFIX)
            .await?
            .iter()
            .filter_map(|e| match ObjectKey::parse(&e.key) {
                Some(ObjectKey::Page(name)) if !with_metadata.contains(name) => {
                    Some(name.to_owned())
                }
                _ => None,
            })
            .collect())
    }

    async fn exists(&self, key: &str) -> Result<bool, PageError> {
        Ok(self.storage.list(key).await?.iter().any(|e| e.key == key))
    }

    async fn read_metadata(&self, canonical_key: &str) -> Option<PageMetadata> {
        let key = layout::metadata_key(canonical_key);
        let bytes = match self.storage.get(&key).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read metadata");
                return None;
            }
        };
        PageMetadata::from_json(&bytes)
            .inspect_err(|e| warn!(key = %key, error = %e, "Ignoring unreadable metadata"))
            .ok()
    }
}

/// Reject blank names, then normalize.
fn validated_key(name: &str) -> Result<String, PageError> {
    if name.trim().is_empty() {
        return Err(PageError::Validation("page name is required".to_owned()));
    }
    Ok(normalize(name))
}

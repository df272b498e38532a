//! Publisher.
//!
//! Persists a document and its metadata sidecar under a canonical key. The body
//! is written first; a metadata failure after a successful body write is
//! reported separately as [`PublishError::Partial`] so callers can tell that
//! the new body is already live.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pw_storage::{PageMetadata, PutOptions, Storage, StorageError, StorageErrorKind, layout};
use tracing::{error, info, warn};

/// Error returned by [`Publisher::publish`].
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Nothing was written.
    #[error("publish failed")]
    Total(#[source] StorageError),
    /// Body was written but metadata was not.
    #[error("page {key} was published but its metadata could not be written")]
    Partial {
        /// Canonical key of the page.
        key: String,
        /// Address of the already-written body.
        public_url: String,
        /// Metadata write failure.
        #[source]
        source: StorageError,
    },
}

/// A document ready to publish.
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    /// Canonical key.
    pub canonical_key: &'a str,
    /// Display title as supplied by the caller.
    pub title: &'a str,
    /// Edit request that produced `body`.
    pub instructions: &'a str,
    /// Document body.
    pub body: &'a str,
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Public address of the body.
    pub public_url: String,
    /// No prior metadata existed.
    pub created: bool,
    /// Metadata as written.
    pub metadata: PageMetadata,
}

/// Writes documents and metadata to a [`Storage`] backend.
pub struct Publisher {
    storage: Arc<dyn Storage>,
}

impl Publisher {
    /// Create a publisher over `storage`.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Publish `request`, timestamped now.
    pub async fn publish(&self, request: PublishRequest<'_>) -> Result<Published, PublishError> {
        self.publish_at(request, Utc::now()).await
    }

    /// Publish `request` with `now` as the publish time.
    pub async fn publish_at(
        &self,
        request: PublishRequest<'_>,
        now: DateTime<Utc>,
    ) -> Result<Published, PublishError> {
        let key = request.canonical_key;
        let meta_key = layout::metadata_key(key);

        let prior = self.read_prior(&meta_key).await.map_err(PublishError::Total)?;

        let page_key = layout::page_key(key);
        let put = self
            .storage
            .put(
                &page_key,
                request.body.as_bytes().to_vec(),
                PutOptions::overwrite(layout::HTML_CONTENT_TYPE),
            )
            .await
            .map_err(PublishError::Total)?;

        let created = prior.is_none();
        let metadata = PageMetadata {
            canonical_key: key.to_owned(),
            title: request.title.to_owned(),
            instructions: request.instructions.to_owned(),
            created_at: prior.map_or(now, |p| p.created_at),
            updated_at: now,
            page_url: put.url.clone(),
            file_name: layout::page_file_name(key),
        };

        if let Err(source) = self.write_metadata(&meta_key, &metadata).await {
            error!(key = %key, error = %source, "Page body written but metadata write failed");
            return Err(PublishError::Partial {
                key: key.to_owned(),
                public_url: put.url,
                source,
            });
        }

        info!(key = %key, url = %put.url, created, "Published page");
        Ok(Published {
            public_url: put.url,
            created,
            metadata,
        })
    }

    /// Read existing metadata. Missing or unparsable records count as absent.
    async fn read_prior(&self, meta_key: &str) -> Result<Option<PageMetadata>, StorageError> {
        match self.storage.get(meta_key).await {
            Ok(bytes) => match PageMetadata::from_json(&bytes) {
                Ok(meta) => Ok(Some(meta)),
                Err(e) => {
                    warn!(key = %meta_key, error = %e, "Ignoring unreadable metadata");
                    Ok(None)
                }
            },
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write_metadata(
        &self,
        meta_key: &str,
        metadata: &PageMetadata,
    ) -> Result<(), StorageError> {
        let json = metadata.to_json().map_err(|e| {
            StorageError::new(StorageErrorKind::Other)
                .with_key(meta_key)
                .with_source(e)
        })?;
        self.storage
            .put(meta_key, json, PutOptions::overwrite(layout::JSON_CONTENT_TYPE))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use pw_storage::{BlobEntry, MemoryStorage, PutResult};

    use super::*;

    /// Wraps a storage and fails every write under `metadata/`.
    pub(crate) struct FailingMetadataStorage {
        inner: MemoryStorage,
    }

    impl FailingMetadataStorage {
        pub(crate) fn new() -> Self {
            Self {
                inner: MemoryStorage::new(),
            }
        }
    }

    #[async_trait]
    impl Storage for FailingMetadataStorage {
        fn backend(&self) -> &'static str {
            "FailingMetadata"
        }

        async fn put(
            &self,
            key: &str,
            body: Vec<u8>,
            options: PutOptions,
        ) -> Result<PutResult, StorageError> {
            if key.starts_with(layout::METADATA_PREFIX) {
                return Err(StorageError::new(StorageErrorKind::Unavailable).with_key(key));
            }
            self.inner.put(key, body, options).await
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            self.inner.get(key).await
        }

        async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, StorageError> {
            self.inner.list(prefix).await
        }

        async fn delete(&self, keys: &[String]) -> Result<(), StorageError> {
            self.inner.delete(keys).await
        }
    }

    /// Fails every read with a permission error.
    struct UnreadableStorage;

    #[async_trait]
    impl Storage for UnreadableStorage {
        fn backend(&self) -> &'static str {
            "Unreadable"
        }

        async fn put(
            &self,
            key: &str,
            _body: Vec<u8>,
            _options: PutOptions,
        ) -> Result<PutResult, StorageError> {
            panic!("unexpected write to {key}");
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::new(StorageErrorKind::PermissionDenied).with_key(key))
        }

        async fn list(&self, _prefix: &str) -> Result<Vec<BlobEntry>, StorageError> {
            Ok(Vec::new())
        }

        async fn delete(&self, _keys: &[String]) -> Result<(), StorageError> {
            Ok(())
        }
    }

    pub(crate) fn shared<S: Storage + 'static>(storage: &Arc<S>) -> Arc<dyn Storage> {
        let storage: Arc<S> = Arc::clone(storage);
        storage
    }

    fn request<'a>(body: &'a str, instructions: &'a str) -> PublishRequest<'a> {
        PublishRequest {
            canonical_key: "pricing",
            title: "Pricing Page",
            instructions,
            body,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_first_publish_creates_page() {
        let storage = Arc::new(MemoryStorage::new());
        let publisher = Publisher::new(shared(&storage));

        let published = publisher
            .publish_at(request("<html>v1</html>", "make a pricing page"), at(9))
            .await
            .unwrap();

        assert!(published.created);
        assert_eq!(published.public_url, "memory://pages/pricing.html");
        assert_eq!(storage.get("pages/pricing.html").await.unwrap(), b"<html>v1</html>");
        assert_eq!(
            storage.content_type("pages/pricing.html").as_deref(),
            Some(layout::HTML_CONTENT_TYPE)
        );

        let meta = PageMetadata::from_json(&storage.get("metadata/pricing.json").await.unwrap())
            .unwrap();
        assert_eq!(
            meta,
            PageMetadata {
                canonical_key: "pricing".to_owned(),
                title: "Pricing Page".to_owned(),
                instructions: "make a pricing page".to_owned(),
                created_at: at(9),
                updated_at: at(9),
                page_url: "memory://pages/pricing.html".to_owned(),
                file_name: "pricing.html".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn test_update_in_place_preserves_created_at() {
        let storage = Arc::new(MemoryStorage::new());
        let publisher = Publisher::new(shared(&storage));
        publisher
            .publish_at(request("<html>v1</html>", "first"), at(9))
            .await
            .unwrap();

        let published = publisher
            .publish_at(request("<html>v2</html>", "make the header blue"), at(11))
            .await
            .unwrap();

        assert!(!published.created);
        assert_eq!(published.metadata.created_at, at(9));
        assert_eq!(published.metadata.updated_at, at(11));
        assert_eq!(published.metadata.instructions, "make the header blue");
        assert_eq!(storage.get("pages/pricing.html").await.unwrap(), b"<html>v2</html>");
        assert_eq!(storage.list("pages/").await.unwrap().len(), 1);
        assert_eq!(storage.list("metadata/").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unparsable_prior_metadata_is_treated_as_new() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .put(
                "metadata/pricing.json",
                b"{broken".to_vec(),
                PutOptions::overwrite(layout::JSON_CONTENT_TYPE),
            )
            .await
            .unwrap();
        let publisher = Publisher::new(shared(&storage));

        let published = publisher
            .publish_at(request("<html></html>", "x"), at(10))
            .await
            .unwrap();

        assert!(published.created);
        assert_eq!(published.metadata.created_at, at(10));
    }

    #[tokio::test]
    async fn test_metadata_failure_is_partial() {
        let storage = Arc::new(FailingMetadataStorage::new());
        let publisher = Publisher::new(shared(&storage));

        let err = publisher
            .publish_at(request("<html>v1</html>", "x"), at(9))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "page pricing was published but its metadata could not be written"
        );
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string),
            Some("Unavailable (key: metadata/pricing.json)".to_owned())
        );
        match err {
            PublishError::Partial {
                key,
                public_url,
                source,
            } => {
                assert_eq!(key, "pricing");
                assert_eq!(public_url, "memory://pages/pricing.html");
                assert_eq!(source.kind, StorageErrorKind::Unavailable);
            }
            PublishError::Total(e) => panic!("expected partial failure, got {e}"),
        }
        assert_eq!(storage.get("pages/pricing.html").await.unwrap(), b"<html>v1</html>");
    }

    #[tokio::test]
    async fn test_prior_read_failure_is_total_and_writes_nothing() {
        let publisher = Publisher::new(Arc::new(UnreadableStorage));

        let err = publisher
            .publish_at(request("<html></html>", "x"), at(9))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PublishError::Total(ref e) if e.kind == StorageErrorKind::PermissionDenied
        ));
    }
}

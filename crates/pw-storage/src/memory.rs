//! In-memory storage implementation.
//!
//! Provides [`MemoryStorage`], the non-durable fallback used when no persistent
//! backend is configured. Contents live as long as the value does.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::storage::{
    BlobEntry, PutOptions, PutResult, Storage, StorageError, StorageErrorKind,
};

/// Backend identifier for error messages.
const BACKEND: &str = "Memory";

/// Stored object.
#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    content_type: String,
}

/// In-memory storage.
///
/// Keys are kept in a sorted map so listings come back ordered by key.
///
/// # Example
///
/// ```ignore
/// use pw_storage::{MemoryStorage, PutOptions, Storage};
///
/// let storage = MemoryStorage::new();
/// storage.put("pages/a.html", b"<html></html>".to_vec(), PutOptions::overwrite("text/html")).await?;
/// let body = storage.get("pages/a.html").await?;
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    base_url: Option<String>,
}

impl MemoryStorage {
    /// Create a new empty in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report URLs under `base_url` instead of `memory://`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_owned());
        self
    }

    /// Content type stored for `key`, if present.
    #[must_use]
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .ok()?
            .get(key)
            .map(|o| o.content_type.clone())
    }

    fn url_for(&self, key: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{base}/{key}"),
            None => format!("memory://{key}"),
        }
    }
}

fn poisoned() -> StorageError {
    StorageError::new(StorageErrorKind::Other).with_backend(BACKEND)
}

#[async_trait]
impl Storage for MemoryStorage {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn is_persistent(&self) -> bool {
        false
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        options: PutOptions,
    ) -> Result<PutResult, StorageError> {
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        if !options.allow_overwrite && objects.contains_key(key) {
            return Err(StorageError::already_exists(key).with_backend(BACKEND));
        }
        objects.insert(
            key.to_owned(),
            StoredObject {
                body,
                content_type: options.content_type,
            },
        );
        Ok(PutResult {
            url: self.url_for(key),
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .map_err(|_| poisoned())?
            .get(key)
            .map(|o| o.body.clone())
            .ok_or_else(|| StorageError::not_found(key).with_backend(BACKEND))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, StorageError> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        Ok(objects
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| BlobEntry {
                key: key.clone(),
                url: self.url_for(key),
            })
            .collect())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn check(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

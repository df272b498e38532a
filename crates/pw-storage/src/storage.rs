//! Storage trait and error types.
//!
//! Provides the core [`Storage`] trait for persisting published pages and their
//! metadata, along with [`StorageError`] for unified error handling across
//! backends.
//!
//! # Key Convention
//!
//! All key parameters are **object keys**, not file paths:
//! - `"pages/pricing.html"` - document body
//! - `"metadata/pricing.json"` - metadata sidecar
//!
//! See [`crate::layout`] for helpers. Implementations map object keys to their
//! internal storage format (files, objects, table rows).

use async_trait::async_trait;

/// Options for a [`Storage::put`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    /// MIME type stored alongside the bytes.
    pub content_type: String,
    /// Replace an existing object at the same key.
    ///
    /// When `false`, writing to an existing key fails with
    /// [`StorageErrorKind::AlreadyExists`].
    pub allow_overwrite: bool,
}

impl PutOptions {
    /// Overwriting put with the given content type.
    #[must_use]
    pub fn overwrite(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            allow_overwrite: true,
        }
    }

    /// Create-only put with the given content type.
    #[must_use]
    pub fn create(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            allow_overwrite: false,
        }
    }
}

/// Result of a successful put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResult {
    /// Address at which the stored object can be reached.
    pub url: String,
}

/// Entry returned by [`Storage::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    /// Object key (e.g., "metadata/pricing.json").
    pub key: String,
    /// Address of the object.
    pub url: String,
}

/// Semantic error categories (inspired by Object Store + `OpenDAL`).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum StorageErrorKind {
    /// Resource does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Resource already exists and overwrite was not allowed.
    AlreadyExists,
    /// Invalid key.
    InvalidPath,
    /// Backend is unreachable or not configured.
    Unavailable,
    /// Operation timed out.
    Timeout,
    /// Other/unknown error category.
    Other,
}

/// Storage error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StorageError {
    /// Semantic error category.
    pub kind: StorageErrorKind,
    /// Key context (if applicable).
    pub key: Option<String>,
    /// Backend identifier (e.g., "Fs", "Memory", "S3", "Sql").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    /// Create a new storage error.
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            key: None,
            backend: None,
            source: None,
        }
    }

    /// Attach key context.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }

    /// Create a not found error with key.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::NotFound).with_key(key)
    }

    /// Create an already-exists error with key.
    #[must_use]
    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::AlreadyExists).with_key(key)
    }

    /// Check whether this error means the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == StorageErrorKind::NotFound
    }

    /// Create a storage error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, key: Option<String>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
            std::io::ErrorKind::AlreadyExists => StorageErrorKind::AlreadyExists,
            std::io::ErrorKind::TimedOut => StorageErrorKind::Timeout,
            _ => StorageErrorKind::Other,
        };
        let mut error = Self::new(kind).with_source(err);
        if let Some(k) = key {
            error = error.with_key(k);
        }
        error
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (key: pages/foo.html)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StorageErrorKind::NotFound => "Not found",
            StorageErrorKind::PermissionDenied => "Permission denied",
            StorageErrorKind::AlreadyExists => "Already exists",
            StorageErrorKind::InvalidPath => "Invalid key",
            StorageErrorKind::Unavailable => "Unavailable",
            StorageErrorKind::Timeout => "Timeout",
            StorageErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(key) = &self.key {
            write!(f, " (key: {key})")?;
        }

        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Storage capability shared by every backend.
///
/// Provides a unified key/value interface for published pages regardless of
/// where they live. The backend is chosen once at startup; callers never
/// branch on it per request.
///
/// # Keys
///
/// All key parameters are object keys (`"pages/{key}.html"`,
/// `"metadata/{key}.json"`), never file paths.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Backend identifier used in logs and health reports.
    fn backend(&self) -> &'static str;

    /// Whether stored objects survive a process restart.
    fn is_persistent(&self) -> bool {
        true
    }

    /// Store bytes under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::AlreadyExists`] when the key exists and
    /// `options.allow_overwrite` is `false`, or another [`StorageError`] when
    /// the backend rejects the write.
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        options: PutOptions,
    ) -> Result<PutResult, StorageError>;

    /// Read the bytes stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::NotFound`] if nothing is stored at `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// List all objects whose key starts with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, StorageError>;

    /// Delete the given keys.
    ///
    /// Keys that do not exist are ignored.
    async fn delete(&self, keys: &[String]) -> Result<(), StorageError>;

    /// Probe that the backend is reachable.
    ///
    /// Default implementation lists the metadata prefix.
    async fn check(&self) -> Result<(), StorageError> {
        self.list(crate::layout::METADATA_PREFIX).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_options_overwrite() {
        let options = PutOptions::overwrite("text/html");

        assert_eq!(options.content_type, "text/html");
        assert!(options.allow_overwrite);
    }

    #[test]
    fn test_put_options_create() {
        let options = PutOptions::create("application/json");

        assert!(!options.allow_overwrite);
    }

    #[test]
    fn test_storage_error_new() {
        let err = StorageError::new(StorageErrorKind::NotFound);

        assert_eq!(err.kind, StorageErrorKind::NotFound);
        assert!(err.key.is_none());
        assert!(err.backend.is_none());
    }

    #[test]
    fn test_storage_error_with_key() {
        let err = StorageError::new(StorageErrorKind::NotFound).with_key("pages/a.html");

        assert_eq!(err.key.as_deref(), Some("pages/a.html"));
    }

    #[test]
    fn test_storage_error_with_backend() {
        let err = StorageError::new(StorageErrorKind::NotFound).with_backend("Fs");

        assert_eq!(err.backend, Some("Fs"));
    }

    #[test]
    fn test_storage_error_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = StorageError::new(StorageErrorKind::NotFound).with_source(io_err);

        assert!(err.downcast_source::<std::io::Error>().is_some());
    }

    #[test]
    fn test_storage_error_not_found() {
        let err = StorageError::not_found("pages/a.html");

        assert!(err.is_not_found());
        assert_eq!(err.key.as_deref(), Some("pages/a.html"));
    }

    #[test]
    fn test_storage_error_already_exists() {
        let err = StorageError::already_exists("pages/a.html");

        assert_eq!(err.kind, StorageErrorKind::AlreadyExists);
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_storage_error_io_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = StorageError::io(io_err, Some("pages/a.html".to_owned()));

        assert_eq!(err.kind, StorageErrorKind::NotFound);
        assert_eq!(err.key.as_deref(), Some("pages/a.html"));
    }

    #[test]
    fn test_storage_error_io_permission_denied() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = StorageError::io(io_err, None);

        assert_eq!(err.kind, StorageErrorKind::PermissionDenied);
    }

    #[test]
    fn test_storage_error_io_timeout() {
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = StorageError::io(io_err, None);

        assert_eq!(err.kind, StorageErrorKind::Timeout);
    }

    #[test]
    fn test_storage_error_display_simple() {
        let err = StorageError::new(StorageErrorKind::NotFound);

        assert_eq!(err.to_string(), "Not found");
    }

    #[test]
    fn test_storage_error_display_full() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = StorageError::new(StorageErrorKind::NotFound)
            .with_backend("Fs")
            .with_key("pages/a.html")
            .with_source(io_err);

        assert_eq!(
            err.to_string(),
            "[Fs] Not found: file not found (key: pages/a.html)"
        );
    }

    #[test]
    fn test_storage_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StorageError>();
    }
}

//! Filesystem storage implementation.
//!
//! Provides [`FsStorage`] for keeping published pages in a local directory.
//! Object keys map directly to relative file paths:
//!
//! ```text
//! {root}/
//! +-- pages/
//! |   +-- pricing.html
//! +-- metadata/
//!     +-- pricing.json
//! ```
//!
//! Writes go to a temporary sibling file that is renamed over the target, so a
//! concurrent reader sees either the previous or the new content, never a
//! truncated file.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::storage::{
    BlobEntry, PutOptions, PutResult, Storage, StorageError, StorageErrorKind,
};

/// Backend identifier for error messages.
const BACKEND: &str = "Fs";

/// Per-process counter that keeps concurrent writers off each other's temp files.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Filesystem storage rooted at a directory.
///
/// # Example
///
/// ```ignore
/// use std::path::PathBuf;
/// use pw_storage::{FsStorage, Storage};
///
/// let storage = FsStorage::new(PathBuf::from("generated-pages"));
/// let pages = storage.list("pages/").await?;
/// ```
#[derive(Debug)]
pub struct FsStorage {
    /// Root directory for stored objects.
    root: PathBuf,
    /// Public base URL reported for stored objects.
    base_url: Option<String>,
}

impl FsStorage {
    /// Create a new filesystem storage rooted at `root`.
    ///
    /// The directory is created lazily on first write.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            base_url: None,
        }
    }

    /// Report URLs under `base_url` instead of `file://` paths.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_owned());
        self
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate that a key doesn't escape the root directory.
    ///
    /// Rejects empty keys, absolute keys and keys containing parent directory
    /// components (`..`) to prevent path traversal (e.g., `../../etc/passwd`).
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !valid {
            return Err(StorageError::new(StorageErrorKind::InvalidPath)
                .with_key(key)
                .with_backend(BACKEND));
        }
        Ok(self.root.join(relative))
    }

    fn url_for(&self, key: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{base}/{key}"),
            None => format!("file://{}", self.root.join(key).display()),
        }
    }

    fn io_error(err: std::io::Error, key: &str) -> StorageError {
        StorageError::io(err, Some(key.to_owned())).with_backend(BACKEND)
    }

    /// Write `body` to `path` through a temporary file and rename.
    ///
    /// Each call writes its own temp file, so concurrent writers to one key
    /// resolve to whichever rename lands last.
    async fn write_atomic(path: &Path, body: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(format!(
            ".{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let tmp_path = path.with_file_name(tmp_name);

        let written = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(body).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp_path, path).await
        }
        .await;

        if written.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }
        written
    }

    /// Collect all file keys under `dir`, relative to the root.
    async fn walk(&self, dir: PathBuf, keys: &mut Vec<String>) -> std::io::Result<()> {
        let mut pending = vec![dir];
        while let Some(current) = pending.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().is_some_and(|ext| ext == "tmp") {
                    continue;
                }
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    keys.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for FsStorage {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        options: PutOptions,
    ) -> Result<PutResult, StorageError> {
        let path = self.resolve(key)?;

        if !options.allow_overwrite
            && fs::try_exists(&path)
                .await
                .map_err(|e| Self::io_error(e, key))?
        {
            return Err(StorageError::already_exists(key).with_backend(BACKEND));
        }

        Self::write_atomic(&path, &body)
            .await
            .map_err(|e| Self::io_error(e, key))?;

        tracing::debug!(key = %key, path = %path.display(), "Stored object");
        Ok(PutResult {
            url: self.url_for(key),
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        fs::read(&path).await.map_err(|e| Self::io_error(e, key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, StorageError> {
        // Walk from the deepest directory the prefix names.
        let dir_part = prefix.rsplit_once('/').map_or("", |(dir, _)| dir);
        let start = if dir_part.is_empty() {
            self.root.clone()
        } else {
            self.resolve(dir_part)?
        };

        let mut keys = Vec::new();
        self.walk(start, &mut keys)
            .await
            .map_err(|e| Self::io_error(e, prefix))?;

        keys.retain(|key| key.starts_with(prefix));
        keys.sort();

        Ok(keys
            .into_iter()
            .map(|key| BlobEntry {
                url: self.url_for(&key),
                key,
            })
            .collect())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            let path = self.resolve(key)?;
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Self::io_error(e, key)),
            }
        }
        Ok(())
    }

    async fn check(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Self::io_error(e, ""))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn html() -> PutOptions {
        PutOptions::overwrite("text/html")
    }

    #[tokio::test]
    async fn test_put_creates_directories() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path().join("site"));

        storage
            .put("pages/a.html", b"<html>a</html>".to_vec(), html())
            .await
            .unwrap();

        let on_disk = std::fs::read(tmp.path().join("site/pages/a.html")).unwrap();
        assert_eq!(on_disk, b"<html>a</html>");
    }

    #[tokio::test]
    async fn test_get_roundtrip_preserves_bytes() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path().to_path_buf());
        let body = "<!DOCTYPE html><html><body>héllo — ✓</body></html>".as_bytes();

        storage.put("pages/u.html", body.to_vec(), html()).await.unwrap();

        assert_eq!(storage.get("pages/u.html").await.unwrap(), body);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path().to_path_buf());

        let err = storage.get("pages/missing.html").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.backend, Some("Fs"));
    }

    #[tokio::test]
    async fn test_create_only_put_rejects_existing() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path().to_path_buf());
        storage
            .put("pages/a.html", b"one".to_vec(), PutOptions::create("text/html"))
            .await
            .unwrap();

        let err = storage
            .put("pages/a.html", b"two".to_vec(), PutOptions::create("text/html"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::AlreadyExists);
        assert_eq!(storage.get("pages/a.html").await.unwrap(), b"one");
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path().to_path_buf());
        storage.put("pages/a.html", b"one".to_vec(), html()).await.unwrap();
        storage.put("pages/a.html", b"two".to_vec(), html()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(tmp.path().join("pages"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();

        assert_eq!(entries, vec!["a.html".to_owned()]);
        assert_eq!(storage.get("pages/a.html").await.unwrap(), b"two");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_overwrites_to_one_key_all_succeed() {
        let tmp = TempDir::new().unwrap();
        let storage = std::sync::Arc::new(FsStorage::new(tmp.path().to_path_buf()));
        let bodies: Vec<Vec<u8>> = (0..4)
            .map(|i| format!("<html>{}</html>", i.to_string().repeat(4096)).into_bytes())
            .collect();

        for _ in 0..25 {
            let mut writers = tokio::task::JoinSet::new();
            for body in &bodies {
                let storage = std::sync::Arc::clone(&storage);
                let body = body.clone();
                writers.spawn(async move { storage.put("pages/home.html", body, html()).await });
            }
            while let Some(joined) = writers.join_next().await {
                joined.unwrap().unwrap();
            }

            let stored = storage.get("pages/home.html").await.unwrap();
            assert!(bodies.contains(&stored));
        }

        let entries: Vec<_> = std::fs::read_dir(tmp.path().join("pages"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["home.html".to_owned()]);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path().to_path_buf());

        let err = storage
            .put("../escape.html", b"x".to_vec(), html())
            .await
            .unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::InvalidPath);

        let err = storage.get("/etc/passwd").await.unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::InvalidPath);
    }

    #[tokio::test]
    async fn test_list_by_prefix_sorted() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path().to_path_buf()).with_base_url("https://x.test");
        for key in ["metadata/b.json", "pages/b.html", "metadata/a.json"] {
            storage.put(key, Vec::new(), html()).await.unwrap();
        }

        let entries = storage.list("metadata/").await.unwrap();

        assert_eq!(
            entries,
            vec![
                BlobEntry {
                    key: "metadata/a.json".to_owned(),
                    url: "https://x.test/metadata/a.json".to_owned(),
                },
                BlobEntry {
                    key: "metadata/b.json".to_owned(),
                    url: "https://x.test/metadata/b.json".to_owned(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path().join("nothing-yet"));

        assert!(storage.list("metadata/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_files() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path().to_path_buf());
        storage.put("pages/a.html", b"a".to_vec(), html()).await.unwrap();
        storage.put("metadata/a.json", b"{}".to_vec(), html()).await.unwrap();

        storage
            .delete(&["pages/a.html".to_owned(), "metadata/a.json".to_owned()])
            .await
            .unwrap();

        assert!(storage.list("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_url_without_base() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path().to_path_buf());

        let result = storage.put("pages/a.html", b"a".to_vec(), html()).await.unwrap();

        assert!(result.url.starts_with("file://"));
        assert!(result.url.ends_with("pages/a.html"));
    }
}

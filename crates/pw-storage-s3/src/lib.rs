//! S3 object-store backend for Pagewright.
//!
//! [`S3Storage`] implements [`Storage`] on any S3-compatible store (AWS S3,
//! `MinIO`, `LocalStack`, Yandex Cloud). Objects are written with
//! `Cache-Control: public, max-age=0` so a republished page is visible on the
//! next read, and create-only puts use a conditional `If-None-Match: *` write
//! instead of silently replacing the object.

use std::error::Error;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use pw_storage::{BlobEntry, PutOptions, PutResult, Storage, StorageError, StorageErrorKind};

/// Backend identifier for error messages.
const BACKEND: &str = "S3";

/// Cache directive applied to every object.
const CACHE_CONTROL: &str = "public, max-age=0";

/// Configuration for the S3 backend.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 bucket name.
    pub bucket: String,
    /// AWS region.
    pub region: String,
    /// S3-compatible endpoint URL.
    pub endpoint: Option<String>,
    /// Optional prefix path within the bucket.
    pub root_path: Option<String>,
    /// Public base URL reported for stored objects.
    pub public_base_url: Option<String>,
}

/// S3 error message (full source chain of an SDK error).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct S3Failure(String);

/// S3-backed storage.
pub struct S3Storage {
    client: Client,
    config: S3Config,
}

impl S3Storage {
    /// Build a client from the default AWS credential chain and `config`.
    pub async fn connect(config: S3Config) -> Self {
        let client = build_client(&config).await;
        Self { client, config }
    }

    /// Full object key including the configured root path.
    fn full_key(&self, key: &str) -> String {
        match self.config.root_path.as_deref().map(|r| r.trim_matches('/')) {
            Some(root) if !root.is_empty() => format!("{root}/{key}"),
            _ => key.to_owned(),
        }
    }

    /// Strip the configured root path from an object key.
    fn relative_key<'a>(&self, full_key: &'a str) -> &'a str {
        match self.config.root_path.as_deref().map(|r| r.trim_matches('/')) {
            Some(root) if !root.is_empty() => full_key
                .strip_prefix(root)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(full_key),
            _ => full_key,
        }
    }

    fn url_for(&self, key: &str) -> String {
        if let Some(base) = &self.config.public_base_url {
            return format!("{}/{key}", base.trim_end_matches('/'));
        }
        let full_key = self.full_key(key);
        match &self.config.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{full_key}",
                endpoint.trim_end_matches('/'),
                self.config.bucket
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{full_key}",
                self.config.bucket, self.config.region
            ),
        }
    }
}

async fn build_client(config: &S3Config) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    let sdk_config = loader.load().await;

    // Custom endpoints (LocalStack, MinIO, Yandex Cloud) require path-style
    // addressing (e.g. endpoint/bucket/key) instead of the default
    // virtual-hosted-style (bucket.endpoint/key).
    if config.endpoint.is_some() {
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();
        return Client::from_conf(s3_config);
    }

    Client::new(&sdk_config)
}

/// Walk the error source chain and join all messages.
fn error_chain(err: &dyn Error) -> String {
    let mut msgs = vec![err.to_string()];
    let mut source = err.source();
    while let Some(s) = source {
        msgs.push(s.to_string());
        source = s.source();
    }
    msgs.join(": ")
}

/// Map an S3 error code to a semantic kind.
fn kind_for_code(code: Option<&str>) -> StorageErrorKind {
    match code {
        Some("NoSuchKey" | "NotFound") => StorageErrorKind::NotFound,
        Some("PreconditionFailed" | "ConditionalRequestConflict") => {
            StorageErrorKind::AlreadyExists
        }
        Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch") => {
            StorageErrorKind::PermissionDenied
        }
        Some("NoSuchBucket" | "SlowDown" | "ServiceUnavailable") => StorageErrorKind::Unavailable,
        _ => StorageErrorKind::Other,
    }
}

fn sdk_error<E, R>(err: &SdkError<E, R>, key: &str) -> StorageError
where
    E: Error + ProvideErrorMetadata + 'static,
    R: std::fmt::Debug,
{
    let kind = match err {
        SdkError::TimeoutError(_) => StorageErrorKind::Timeout,
        SdkError::DispatchFailure(_) => StorageErrorKind::Unavailable,
        _ => kind_for_code(err.code()),
    };
    StorageError::new(kind)
        .with_key(key)
        .with_backend(BACKEND)
        .with_source(S3Failure(error_chain(err)))
}

#[async_trait]
impl Storage for S3Storage {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        options: PutOptions,
    ) -> Result<PutResult, StorageError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(self.full_key(key))
            .body(ByteStream::from(body))
            .content_type(options.content_type)
            .cache_control(CACHE_CONTROL);

        if !options.allow_overwrite {
            request = request.if_none_match("*");
        }

        request.send().await.map_err(|e| sdk_error(&e, key))?;

        tracing::debug!(key = %key, "Uploaded");
        Ok(PutResult {
            url: self.url_for(key),
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(self.full_key(key))
            .send()
            .await
            .map_err(|e| sdk_error(&e, key))?;

        let data = output.body.collect().await.map_err(|e| {
            StorageError::new(StorageErrorKind::Other)
                .with_key(key)
                .with_backend(BACKEND)
                .with_source(e)
        })?;
        Ok(data.into_bytes().to_vec())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, StorageError> {
        let full_prefix = self.full_key(prefix);
        let mut entries = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.config.bucket)
                .prefix(&full_prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| sdk_error(&e, prefix))?;

            for object in output.contents() {
                if let Some(full_key) = object.key() {
                    let key = self.relative_key(full_key);
                    entries.push(BlobEntry {
                        url: self.url_for(key),
                        key: key.to_owned(),
                    });
                }
            }

            match output.next_continuation_token() {
                Some(token) if output.is_truncated() == Some(true) => {
                    continuation = Some(token.to_owned());
                }
                _ => break,
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StorageError> {
        // S3 DeleteObject succeeds for missing keys.
        for key in keys {
            self.client
                .delete_object()
                .bucket(&self.config.bucket)
                .key(self.full_key(key))
                .send()
                .await
                .map_err(|e| sdk_error(&e, key))?;
            tracing::debug!(key = %key, "Deleted");
        }
        Ok(())
    }

    async fn check(&self) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|e| sdk_error(&e, ""))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn config() -> S3Config {
        S3Config {
            bucket: "pages-bucket".to_owned(),
            region: "us-east-1".to_owned(),
            endpoint: None,
            root_path: None,
            public_base_url: None,
        }
    }

    async fn storage(config: S3Config) -> S3Storage {
        S3Storage::connect(config).await
    }

    #[tokio::test]
    async fn test_full_key_without_root() {
        let storage = storage(config()).await;

        assert_eq!(storage.full_key("pages/a.html"), "pages/a.html");
    }

    #[tokio::test]
    async fn test_full_key_with_root() {
        let storage = storage(S3Config {
            root_path: Some("/sites/landing/".to_owned()),
            ..config()
        })
        .await;

        assert_eq!(storage.full_key("pages/a.html"), "sites/landing/pages/a.html");
        assert_eq!(
            storage.relative_key("sites/landing/pages/a.html"),
            "pages/a.html"
        );
    }

    #[tokio::test]
    async fn test_url_virtual_hosted() {
        let storage = storage(config()).await;

        assert_eq!(
            storage.url_for("pages/a.html"),
            "https://pages-bucket.s3.us-east-1.amazonaws.com/pages/a.html"
        );
    }

    #[tokio::test]
    async fn test_url_custom_endpoint() {
        let storage = storage(S3Config {
            endpoint: Some("http://localhost:9000/".to_owned()),
            ..config()
        })
        .await;

        assert_eq!(
            storage.url_for("pages/a.html"),
            "http://localhost:9000/pages-bucket/pages/a.html"
        );
    }

    #[tokio::test]
    async fn test_url_public_base() {
        let storage = storage(S3Config {
            public_base_url: Some("https://cdn.example.com/".to_owned()),
            root_path: Some("ignored".to_owned()),
            ..config()
        })
        .await;

        assert_eq!(
            storage.url_for("pages/a.html"),
            "https://cdn.example.com/pages/a.html"
        );
    }

    #[test]
    fn test_kind_for_code() {
        assert_eq!(kind_for_code(Some("NoSuchKey")), StorageErrorKind::NotFound);
        assert_eq!(
            kind_for_code(Some("PreconditionFailed")),
            StorageErrorKind::AlreadyExists
        );
        assert_eq!(
            kind_for_code(Some("AccessDenied")),
            StorageErrorKind::PermissionDenied
        );
        assert_eq!(kind_for_code(Some("NoSuchBucket")), StorageErrorKind::Unavailable);
        assert_eq!(kind_for_code(None), StorageErrorKind::Other);
    }

    #[test]
    fn test_error_chain_joins_sources() {
        let inner = std::io::Error::other("connection reset");
        let outer = StorageError::new(StorageErrorKind::Other).with_source(inner);

        assert_eq!(error_chain(&outer), "Error: connection reset: connection reset");
    }
}

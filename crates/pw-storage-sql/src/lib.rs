//! Relational storage backend for Pagewright.
//!
//! [`SqlStorage`] keeps every page in one row of a `pages` table: the document
//! body and each metadata field are separate columns, and the row is keyed by
//! a generated UUID with a unique `name` column holding the canonical key.
//!
//! Object keys from the shared layout are mapped onto columns:
//!
//! ```text
//! pages/{name}.html     -> pages.html_content
//! metadata/{name}.json  -> pages.title, instructions, page_url, file_name,
//!                          created_at, updated_at
//! ```
//!
//! A part is present when its columns are non-null. Deleting both parts of a
//! page removes the row.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use pw_storage::layout::{self, ObjectKey};
use pw_storage::{
    BlobEntry, PageMetadata, PutOptions, PutResult, Storage, StorageError, StorageErrorKind,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};
use uuid::Uuid;

/// Backend identifier for error messages.
const BACKEND: &str = "Sql";

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS pages (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    html_content BLOB,
    title TEXT,
    instructions TEXT,
    page_url TEXT,
    file_name TEXT,
    created_at TEXT,
    updated_at TEXT
)";

/// Metadata columns of a row whose metadata part is present.
#[derive(Debug, sqlx::FromRow)]
struct MetadataRow {
    name: String,
    title: String,
    instructions: String,
    page_url: String,
    file_name: Option<String>,
    created_at: String,
    updated_at: String,
}

impl MetadataRow {
    fn into_metadata(self) -> Result<PageMetadata, chrono::ParseError> {
        Ok(PageMetadata {
            canonical_key: self.name,
            title: self.title,
            instructions: self.instructions,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            page_url: self.page_url,
            file_name: self.file_name.unwrap_or_default(),
        })
    }
}

/// SQLite-backed storage.
pub struct SqlStorage {
    pool: Pool<Sqlite>,
    base_url: Option<String>,
}

impl SqlStorage {
    /// Open the database at `url` and create the `pages` table if missing.
    ///
    /// Accepts any `SQLite` connection string, including `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| sql_error(e, url))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // A single long-lived connection serializes writers and keeps
        // in-memory databases alive for the lifetime of the pool.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| sql_error(e, url))?;

        sqlx::query(SCHEMA_SQL)
            .execute(&pool)
            .await
            .map_err(|e| sql_error(e, "pages"))?;

        tracing::debug!(url = %url, "Opened page database");
        Ok(Self {
            pool,
            base_url: None,
        })
    }

    /// Report URLs under `base_url` instead of `sql://` keys.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_owned());
        self
    }

    fn url_for(&self, key: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{base}/{key}"),
            None => format!("sql://{key}"),
        }
    }
}

fn parse_key(key: &str) -> Result<ObjectKey<'_>, StorageError> {
    ObjectKey::parse(key).ok_or_else(|| {
        StorageError::new(StorageErrorKind::InvalidPath)
            .with_key(key)
            .with_backend(BACKEND)
    })
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc))
}

fn sql_error(err: sqlx::Error, key: &str) -> StorageError {
    let kind = match &err {
        sqlx::Error::RowNotFound => StorageErrorKind::NotFound,
        sqlx::Error::PoolTimedOut => StorageErrorKind::Timeout,
        sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::Configuration(_) => {
            StorageErrorKind::Unavailable
        }
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageErrorKind::AlreadyExists,
        _ => StorageErrorKind::Other,
    };
    StorageError::new(kind)
        .with_key(key)
        .with_backend(BACKEND)
        .with_source(err)
}

/// Whether the part of the page named by `object` is stored.
async fn part_exists(conn: &mut SqliteConnection, object: ObjectKey<'_>) -> sqlx::Result<bool> {
    let sql = match object {
        ObjectKey::Page(_) => {
            "SELECT COUNT(*) FROM pages WHERE name = ? AND html_content IS NOT NULL"
        }
        ObjectKey::Metadata(_) => {
            "SELECT COUNT(*) FROM pages WHERE name = ? AND updated_at IS NOT NULL"
        }
    };
    let count: i64 = sqlx::query_scalar(sql)
        .bind(object.canonical_key())
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

async fn upsert_page(conn: &mut SqliteConnection, name: &str, body: &[u8]) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO pages (id, name, html_content) VALUES (?, ?, ?)
         ON CONFLICT(name) DO UPDATE SET html_content = excluded.html_content",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(body)
    .execute(conn)
    .await?;
    Ok(())
}

async fn upsert_metadata(
    conn: &mut SqliteConnection,
    name: &str,
    meta: &PageMetadata,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO pages (id, name, title, instructions, page_url, file_name, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(name) DO UPDATE SET
             title = excluded.title,
             instructions = excluded.instructions,
             page_url = excluded.page_url,
             file_name = excluded.file_name,
             created_at = excluded.created_at,
             updated_at = excluded.updated_at",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(&meta.title)
    .bind(&meta.instructions)
    .bind(&meta.page_url)
    .bind(&meta.file_name)
    .bind(format_timestamp(meta.created_at))
    .bind(format_timestamp(meta.updated_at))
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl Storage for SqlStorage {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        options: PutOptions,
    ) -> Result<PutResult, StorageError> {
        let object = parse_key(key)?;

        // Validate metadata before touching the database.
        let meta = match object {
            ObjectKey::Metadata(_) => Some(PageMetadata::from_json(&body).map_err(|e| {
                StorageError::new(StorageErrorKind::Other)
                    .with_key(key)
                    .with_backend(BACKEND)
                    .with_source(e)
            })?),
            ObjectKey::Page(_) => None,
        };

        let mut tx = self.pool.begin().await.map_err(|e| sql_error(e, key))?;

        if !options.allow_overwrite
            && part_exists(&mut *tx, object)
                .await
                .map_err(|e| sql_error(e, key))?
        {
            return Err(StorageError::already_exists(key).with_backend(BACKEND));
        }

        let name = object.canonical_key();
        let written = match &meta {
            Some(meta) => upsert_metadata(&mut *tx, name, meta).await,
            None => upsert_page(&mut *tx, name, &body).await,
        };
        written.map_err(|e| sql_error(e, key))?;

        tx.commit().await.map_err(|e| sql_error(e, key))?;

        tracing::debug!(key = %key, "Stored row");
        Ok(PutResult {
            url: self.url_for(key),
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let object = parse_key(key)?;
        let not_found = || StorageError::not_found(key).with_backend(BACKEND);

        match object {
            ObjectKey::Page(name) => {
                let body: Option<Option<Vec<u8>>> =
                    sqlx::query_scalar("SELECT html_content FROM pages WHERE name = ?")
                        .bind(name)
                        .fetch_optional(&self.pool)
                        .await
                        .map_err(|e| sql_error(e, key))?;
                body.flatten().ok_or_else(not_found)
            }
            ObjectKey::Metadata(name) => {
                let row: Option<MetadataRow> = sqlx::query_as(
                    "SELECT name, title, instructions, page_url, file_name, created_at, updated_at
                     FROM pages WHERE name = ? AND updated_at IS NOT NULL",
                )
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| sql_error(e, key))?;

                let meta = row.ok_or_else(not_found)?.into_metadata().map_err(|e| {
                    StorageError::new(StorageErrorKind::Other)
                        .with_key(key)
                        .with_backend(BACKEND)
                        .with_source(e)
                })?;
                meta.to_json().map_err(|e| {
                    StorageError::new(StorageErrorKind::Other)
                        .with_key(key)
                        .with_backend(BACKEND)
                        .with_source(e)
                })
            }
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, StorageError> {
        let rows: Vec<(String, bool, bool)> = sqlx::query_as(
            "SELECT name, html_content IS NOT NULL, updated_at IS NOT NULL FROM pages",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| sql_error(e, prefix))?;

        let mut keys: Vec<String> = rows
            .into_iter()
            .flat_map(|(name, has_page, has_metadata)| {
                let page = has_page.then(|| layout::page_key(&name));
                let metadata = has_metadata.then(|| layout::metadata_key(&name));
                page.into_iter().chain(metadata)
            })
            .filter(|key| key.starts_with(prefix))
            .collect();
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
        let mut tx = self.pool.begin().await.map_err(|e| sql_error(e, ""))?;

        for key in keys {
            // Keys outside the layout have nothing stored under them.
            let Some(object) = ObjectKey::parse(key) else {
                continue;
            };
            let sql = match object {
                ObjectKey::Page(_) => "UPDATE pages SET html_content = NULL WHERE name = ?",
                ObjectKey::Metadata(_) => {
                    "UPDATE pages SET title = NULL, instructions = NULL, page_url = NULL,
                         file_name = NULL, created_at = NULL, updated_at = NULL
                     WHERE name = ?"
                }
            };
            sqlx::query(sql)
                .bind(object.canonical_key())
                .execute(&mut *tx)
                .await
                .map_err(|e| sql_error(e, key))?;
        }

        let removed = sqlx::query(
            "DELETE FROM pages WHERE html_content IS NULL AND updated_at IS NULL",
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| sql_error(e, ""))?
        .rows_affected();

        tx.commit().await.map_err(|e| sql_error(e, ""))?;

        tracing::debug!(keys = keys.len(), rows_removed = removed, "Deleted");
        Ok(())
    }

    async fn check(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| sql_error(e, ""))?;
        Ok(())
    }
}

//! Storage abstraction for Pagewright.
//!
//! This crate provides a [`Storage`] trait for persisting published pages and
//! their metadata independently of the backend. This enables:
//!
//! - **Backend flexibility** (in-memory, filesystem, S3, relational)
//! - **Unit testing** against the in-memory backend
//! - **Clean separation** between the publishing pipeline and I/O
//!
//! # Architecture
//!
//! The crate provides:
//! - [`Storage`] trait with `put()`, `get()`, `list()`, and `delete()` methods
//! - [`layout`] helpers for the `pages/` and `metadata/` key convention
//! - [`PageMetadata`] sidecar record
//! - [`MemoryStorage`], the non-durable fallback backend
//! - [`FsStorage`] for a local directory
//!
//! Object-store and relational backends live in `pw-storage-s3` and
//! `pw-storage-sql`.
//!
//! # Example
//!
//! ```ignore
//! use pw_storage::{MemoryStorage, Storage, layout};
//!
//! let storage = MemoryStorage::new();
//! for entry in storage.list(layout::METADATA_PREFIX).await? {
//!     println!("{}: {}", entry.key, entry.url);
//! }
//! ```

mod fs;
pub mod layout;
mod memory;
mod metadata;
mod storage;

pub use fs::FsStorage;
pub use memory::MemoryStorage;
pub use metadata::{MetadataError, PageMetadata};
pub use storage::{
    BlobEntry, PutOptions, PutResult, Storage, StorageError, StorageErrorKind,
};

//! Pipeline error taxonomy.

use pw_generator::GenerationError;
use pw_storage::StorageError;

use crate::publish::PublishError;

/// Error returned by [`crate::PageService`] operations.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// Request failed validation.
    #[error("{0}")]
    Validation(String),

    /// No stored document for the canonical key.
    #[error("page not found: {0}")]
    NotFound(String),

    /// Provider failed; nothing was published.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Storage failed; nothing was persisted.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    /// Body was persisted but its metadata was not.
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

impl From<PublishError> for PageError {
    fn from(e: PublishError) -> Self {
        match e {
            PublishError::Total(source) => Self::Storage(source),
            PublishError::Partial {
                key,
                public_url,
                source,
            } => Self::Partial {
                key,
                public_url,
                source,
            },
        }
    }
}

//! Content fetcher.

use pw_storage::{Storage, layout};
use tracing::{debug, warn};

/// Read the currently published body for `canonical_key`.
///
/// Absence is a signal, not an error: a missing page, a failed read, an empty
/// body or a body that is not UTF-8 all yield `None`.
pub async fn fetch_existing(storage: &dyn Storage, canonical_key: &str) -> Option<String> {
    let key = layout::page_key(canonical_key);

    let bytes = match storage.get(&key).await {
        Ok(bytes) => bytes,
        Err(e) if e.is_not_found() => {
            debug!(key = %key, "No existing page");
            return None;
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read existing page, treating as new");
            return None;
        }
    };

    match String::from_utf8(bytes) {
        Ok(body) if body.is_empty() => None,
        Ok(body) => {
            debug!(key = %key, bytes = body.len(), "Found existing page");
            Some(body)
        }
        Err(_) => {
            warn!(key = %key, "Existing page is not valid UTF-8, treating as new");
            None
        }
    }
}

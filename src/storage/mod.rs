//! Storage backends: where finished decks end up.
//!
//! The commit stage talks to a [`DeckStore`] trait object so the service is
//! independent of the provider:
//!
//! | Backend | Destination identifier | Use |
//! |---------|------------------------|-----|
//! | [`DriveStore`]  | Drive folder id | production |
//! | [`LocalStore`]  | directory name under a root | self-hosting, demos |
//! | [`MemoryStore`] | any registered key | tests, dry runs |
//!
//! A backend makes exactly one write attempt per call. Retrying is the
//! caller's decision, because a write that timed out may still have landed.

pub mod drive;
pub mod local;
pub mod memory;

pub use drive::DriveStore;
pub use local::LocalStore;
pub use memory::MemoryStore;

use crate::error::StorageError;
use async_trait::async_trait;

/// Everything a backend needs to place one deck.
#[derive(Debug, Clone)]
pub struct DeckUpload {
    /// Caller-supplied container identifier (Drive folder id, directory name).
    pub destination: String,
    /// Named subfolder inside the destination, found or created on demand.
    pub subfolder: Option<String>,
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    /// Make the placed file readable by anyone holding the link.
    pub share_publicly: bool,
}

/// Where a deck was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDeck {
    /// Backend-specific identifier of the stored file.
    pub reference: String,
    pub file_name: String,
    pub link: Option<String>,
}

/// A place decks can be committed to.
#[async_trait]
pub trait DeckStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Make one attempt to store `upload` at its destination.
    async fn place(&self, upload: DeckUpload) -> Result<StoredDeck, StorageError>;
}

/// Reject identifiers that could escape their container when used as a path
/// component or query literal.
pub(crate) fn check_identifier(destination: &str, id: &str) -> Result<(), StorageError> {
    let invalid = |reason: &str| StorageError::InvalidDestination {
        destination: destination.to_string(),
        reason: reason.to_string(),
    };
    if id.trim().is_empty() {
        return Err(invalid("identifier is empty"));
    }
    if id == "." || id == ".." {
        return Err(invalid("identifier must not be a relative path"));
    }
    if id.contains(['/', '\\']) {
        return Err(invalid("identifier must not contain path separators"));
    }
    if id.chars().any(char::is_control) {
        return Err(invalid("identifier must not contain control characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifiers_pass() {
        for id in ["folder123", "1AbC-dEf_GhI", "Create Games", "naïve"] {
            check_identifier(id, id).unwrap();
        }
    }

    #[test]
    fn path_like_identifiers_rejected() {
        for id in ["", "  ", ".", "..", "a/b", "..\\x", "x\0y"] {
            let err = check_identifier(id, id).unwrap_err();
            assert!(
                matches!(err, StorageError::InvalidDestination { .. }),
                "{id:?}: {err}"
            );
        }
    }
}

//! Commit stage: scratch deck → destination.
//!
//! Exactly one `place` call is made per request, bounded by the configured
//! storage timeout. A timed-out write is not retried here: the backend may
//! have accepted it, and a blind retry could leave two copies. The scratch
//! partition is removed whatever the outcome.

use crate::config::ServiceConfig;
use crate::error::StorageError;
use crate::pipeline::package::PPTX_CONTENT_TYPE;
use crate::pipeline::scratch::ScratchDeck;
use crate::storage::{DeckStore, DeckUpload, StoredDeck};
use std::time::Duration;
use tracing::{debug, warn};

/// Upload the scratch deck to `destination`, then clean up the scratch area.
pub async fn commit(
    store: &dyn DeckStore,
    scratch: ScratchDeck,
    destination: &str,
    config: &ServiceConfig,
) -> Result<StoredDeck, StorageError> {
    let outcome = attempt(store, &scratch, destination, config).await;
    scratch.close();
    outcome
}

async fn attempt(
    store: &dyn DeckStore,
    scratch: &ScratchDeck,
    destination: &str,
    config: &ServiceConfig,
) -> Result<StoredDeck, StorageError> {
    let bytes = scratch.read().await.map_err(|e| StorageError::Io {
        detail: format!("reading scratch deck {}: {e}", scratch.path().display()),
    })?;

    let upload = DeckUpload {
        destination: destination.to_string(),
        subfolder: config.output_folder.clone(),
        file_name: scratch.file_name().to_string(),
        content_type: PPTX_CONTENT_TYPE,
        bytes,
        share_publicly: config.share_publicly,
    };

    let secs = config.storage_timeout_secs;
    debug!(
        "Committing {} ({} bytes) to {} via {}",
        upload.file_name,
        scratch.size(),
        destination,
        store.name()
    );
    match tokio::time::timeout(Duration::from_secs(secs), store.place(upload)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!("Storage write to {} exceeded {}s; state unknown", destination, secs);
            Err(StorageError::Timeout { secs })
        }
    }
}

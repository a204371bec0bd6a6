//! In-memory store for tests and dry runs.

use crate::error::StorageError;
use crate::storage::{check_identifier, DeckStore, DeckUpload, StoredDeck};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A deck held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFile {
    pub id: String,
    pub name: String,
    pub subfolder: Option<String>,
    pub bytes: Vec<u8>,
    pub shared: bool,
}

/// Destinations must be registered before decks can be placed in them, so
/// "unknown folder" behaves like it does against a real backend.
#[derive(Default)]
pub struct MemoryStore {
    folders: RwLock<HashMap<String, Vec<MemoryFile>>>,
    failure: Mutex<Option<StorageError>>,
    delay: Mutex<Option<Duration>>,
    attempts: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_destination(self, destination: impl Into<String>) -> Self {
        self.add_destination(destination);
        self
    }

    pub fn add_destination(&self, destination: impl Into<String>) {
        self.folders.write().entry(destination.into()).or_default();
    }

    /// Make every subsequent `place` fail with `error`.
    pub fn fail_with(&self, error: StorageError) {
        *self.failure.lock() = Some(error);
    }

    /// Make every subsequent `place` sleep before answering.
    pub fn delay_by(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Files placed in `destination`, in placement order.
    pub fn files_in(&self, destination: &str) -> Vec<MemoryFile> {
        self.folders
            .read()
            .get(destination)
            .cloned()
            .unwrap_or_default()
    }

    pub fn total_files(&self) -> usize {
        self.folders.read().values().map(Vec::len).sum()
    }

    /// Number of `place` calls, successful or not.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeckStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn place(&self, upload: DeckUpload) -> Result<StoredDeck, StorageError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        check_identifier(&upload.destination, &upload.destination)?;

        let mut folders = self.folders.write();
        let files = folders
            .get_mut(&upload.destination)
            .ok_or_else(|| StorageError::DestinationNotFound {
                destination: upload.destination.clone(),
            })?;

        let id = format!("mem-{n}");
        files.push(MemoryFile {
            id: id.clone(),
            name: upload.file_name.clone(),
            subfolder: upload.subfolder,
            bytes: upload.bytes,
            shared: upload.share_publicly,
        });

        Ok(StoredDeck {
            link: Some(format!("memory://{}/{}", upload.destination, id)),
            reference: id,
            file_name: upload.file_name,
        })
    }
}

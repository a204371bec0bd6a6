//! Per-request scratch storage.
//!
//! Each request gets its own `TempDir` partition under the scratch root, so
//! concurrent requests never see each other's files. The rendered deck is
//! written there before the commit stage reads it back. The partition is
//! removed by [`ScratchDeck::close`] (or on drop if that is skipped).

use crate::error::RenderError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const PARTITION_PREFIX: &str = "qa2deck-";

/// A rendered deck sitting in its own scratch partition.
#[derive(Debug)]
pub struct ScratchDeck {
    dir: TempDir,
    path: PathBuf,
    file_name: String,
    size: u64,
}

impl ScratchDeck {
    /// Create a fresh partition under `root` and write `bytes` as `file_name`.
    pub async fn persist(root: &Path, file_name: &str, bytes: &[u8]) -> Result<Self, RenderError> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(scratch_err(root))?;
        let dir = tempfile::Builder::new()
            .prefix(PARTITION_PREFIX)
            .tempdir_in(root)
            .map_err(scratch_err(root))?;

        let path = dir.path().join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(scratch_err(&path))?;

        debug!("Wrote {} bytes to scratch {}", bytes.len(), path.display());
        Ok(Self {
            dir,
            path,
            file_name: file_name.to_string(),
            size: bytes.len() as u64,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding this request's files.
    pub fn partition(&self) -> &Path {
        self.dir.path()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the deck back for upload.
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Remove the partition. Failure is logged, never propagated: the deck
    /// has already been committed or the request has already failed.
    pub fn close(self) {
        let partition = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove scratch {}: {}", partition.display(), e);
        } else {
            debug!("Removed scratch {}", partition.display());
        }
    }
}

fn scratch_err(path: &Path) -> impl FnOnce(std::io::Error) -> RenderError {
    let path = path.to_path_buf();
    move |source| RenderError::Scratch { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn persist_then_close_removes_partition() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchDeck::persist(root.path(), "deck.pptx", b"PK\x03\x04")
            .await
            .unwrap();

        assert!(scratch.path().exists());
        assert_eq!(scratch.size(), 4);
        assert_eq!(scratch.read().await.unwrap(), b"PK\x03\x04");
        assert!(scratch
            .partition()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(PARTITION_PREFIX));

        let partition = scratch.partition().to_path_buf();
        scratch.close();
        assert!(!partition.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn concurrent_requests_get_distinct_partitions() {
        let root = TempDir::new().unwrap();
        let a = ScratchDeck::persist(root.path(), "same.pptx", b"a").await.unwrap();
        let b = ScratchDeck::persist(root.path(), "same.pptx", b"b").await.unwrap();
        assert_ne!(a.partition(), b.partition());
        assert_eq!(a.read().await.unwrap(), b"a");
        assert_eq!(b.read().await.unwrap(), b"b");
    }

    #[tokio::test]
    async fn creates_missing_root() {
        let base = TempDir::new().unwrap();
        let root = base.path().join("nested").join("scratch");
        let scratch = ScratchDeck::persist(&root, "d.pptx", b"x").await.unwrap();
        assert!(scratch.path().starts_with(&root));
    }

    #[tokio::test]
    async fn unusable_root_is_scratch_error() {
        let base = TempDir::new().unwrap();
        let file = base.path().join("not-a-dir");
        std::fs::write(&file, b"").unwrap();
        let err = ScratchDeck::persist(&file, "d.pptx", b"x").await.unwrap_err();
        assert!(matches!(err, RenderError::Scratch { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn drop_also_cleans_up() {
        let root = TempDir::new().unwrap();
        let partition = {
            let scratch = ScratchDeck::persist(root.path(), "d.pptx", b"x").await.unwrap();
            scratch.partition().to_path_buf()
        };
        assert!(!partition.exists());
    }
}

//! Filesystem store: destinations are existing directories under a root.
//!
//! The destination identifier must name a directory that already exists
//! directly under the root; the store never creates destinations, only the
//! optional subfolder inside one. Files are written to a temp file in the
//! target directory and then persisted without clobbering, so readers never
//! see a half-written deck and two decks with the same name both survive.

use crate::error::StorageError;
use crate::storage::{check_identifier, DeckStore, DeckUpload, StoredDeck};
use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Attempts at finding a free `name (n).pptx` before giving up.
const MAX_NAME_ATTEMPTS: usize = 100;

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, destination: &str) -> Result<PathBuf, StorageError> {
        check_identifier(destination, destination)?;
        let dir = self.root.join(destination);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(StorageError::DestinationNotFound {
                destination: destination.to_string(),
            })
        }
    }
}

#[async_trait]
impl DeckStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn place(&self, upload: DeckUpload) -> Result<StoredDeck, StorageError> {
        let mut dir = self.resolve(&upload.destination)?;
        if let Some(sub) = &upload.subfolder {
            check_identifier(&upload.destination, sub)?;
            dir.push(sub);
        }
        if upload.share_publicly {
            debug!("Local store has no sharing; ignoring share_publicly");
        }

        let root = self.root.clone();
        let destination = upload.destination.clone();
        tokio::task::spawn_blocking(move || write_noclobber(&root, &dir, &destination, &upload))
            .await
            .map_err(|e| StorageError::Io {
                detail: format!("write task failed: {e}"),
            })?
    }
}

fn write_noclobber(
    root: &Path,
    dir: &Path,
    destination: &str,
    upload: &DeckUpload,
) -> Result<StoredDeck, StorageError> {
    let io_err = |e: std::io::Error| classify_io(destination, e);

    std::fs::create_dir_all(dir).map_err(io_err)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".qa2deck-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(io_err)?;
    tmp.write_all(&upload.bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;

    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let name = numbered_name(&upload.file_name, attempt);
        let target = dir.join(&name);
        match tmp.persist_noclobber(&target) {
            Ok(_) => {
                debug!("Placed {} ({} bytes)", target.display(), upload.bytes.len());
                let reference = target
                    .strip_prefix(root)
                    .unwrap_or(&target)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let link = std::path::absolute(&target)
                    .ok()
                    .map(|p| format!("file://{}", p.display()));
                return Ok(StoredDeck {
                    reference,
                    file_name: name,
                    link,
                });
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => tmp = e.file,
            Err(e) => return Err(io_err(e.error)),
        }
    }

    Err(StorageError::Io {
        detail: format!(
            "no free name for '{}' after {} attempts",
            upload.file_name, MAX_NAME_ATTEMPTS
        ),
    })
}

/// `deck.pptx`, then `deck (2).pptx`, `deck (3).pptx`, …
fn numbered_name(file_name: &str, attempt: usize) -> String {
    if attempt <= 1 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({attempt}).{ext}"),
        _ => format!("{file_name} ({attempt})"),
    }
}

fn classify_io(destination: &str, e: std::io::Error) -> StorageError {
    match e.kind() {
        ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem => {
            StorageError::DestinationNotWritable {
                destination: destination.to_string(),
                detail: e.to_string(),
            }
        }
        ErrorKind::NotFound => StorageError::DestinationNotFound {
            destination: destination.to_string(),
        },
        _ => StorageError::Io {
            detail: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn upload(destination: &str, subfolder: Option<&str>) -> DeckUpload {
        DeckUpload {
            destination: destination.into(),
            subfolder: subfolder.map(String::from),
            file_name: "Quiz_Jan 01 09 30 AM.pptx".into(),
            content_type: "application/octet-stream",
            bytes: b"deck".to_vec(),
            share_publicly: false,
        }
    }

    #[tokio::test]
    async fn places_file_in_existing_destination() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("folder123")).unwrap();
        let store = LocalStore::new(root.path());

        let stored = store.place(upload("folder123", None)).await.unwrap();
        assert_eq!(stored.reference, "folder123/Quiz_Jan 01 09 30 AM.pptx");
        let on_disk = root.path().join("folder123").join(&stored.file_name);
        assert_eq!(std::fs::read(on_disk).unwrap(), b"deck");
    }

    #[tokio::test]
    async fn creates_subfolder_inside_destination() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("f")).unwrap();
        let store = LocalStore::new(root.path());

        let stored = store.place(upload("f", Some("Create Games"))).await.unwrap();
        assert!(stored.reference.starts_with("f/Create Games/"));
        assert!(root.path().join("f/Create Games").is_dir());
    }

    #[tokio::test]
    async fn missing_destination_not_found() {
        let root = TempDir::new().unwrap();
        let store = LocalStore::new(root.path());
        let err = store.place(upload("ghost", None)).await.unwrap_err();
        assert!(matches!(err, StorageError::DestinationNotFound { .. }));
        assert!(!root.path().join("ghost").exists());
    }

    #[tokio::test]
    async fn traversal_rejected() {
        let root = TempDir::new().unwrap();
        let store = LocalStore::new(root.path());
        for dest in ["..", "../etc", "a/b"] {
            let err = store.place(upload(dest, None)).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidDestination { .. }), "{dest}");
        }
    }

    #[tokio::test]
    async fn same_name_twice_keeps_both() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("f")).unwrap();
        let store = LocalStore::new(root.path());

        let a = store.place(upload("f", None)).await.unwrap();
        let b = store.place(upload("f", None)).await.unwrap();
        assert_ne!(a.file_name, b.file_name);
        assert_eq!(b.file_name, "Quiz_Jan 01 09 30 AM (2).pptx");

        let names: Vec<_> = std::fs::read_dir(root.path().join("f"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 2, "no .part leftovers: {names:?}");
    }

    #[test]
    fn numbered_names() {
        assert_eq!(numbered_name("a.pptx", 1), "a.pptx");
        assert_eq!(numbered_name("a.pptx", 3), "a (3).pptx");
        assert_eq!(numbered_name("noext", 2), "noext (2)");
    }
}

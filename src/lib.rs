//! # qa2deck
//!
//! Turn spreadsheet question/answer rows into a PowerPoint deck and commit
//! it to cloud storage.
//!
//! A client (typically a spreadsheet script) POSTs
//! `{"data": [{"question", "answer"}, …], "folderId": "…"}` to `/process`.
//! The service builds one framing slide plus one slide per record, writes the
//! `.pptx` into a per-request scratch area, uploads it to the destination
//! folder, and answers with a JSON success or failure body.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /process
//!  │
//!  ├─ 1. Request  validate body, coerce cells to text
//!  ├─ 2. Fit      normalise + truncate text per block capacity
//!  ├─ 3. Deck     framing slide + one slide per record
//!  ├─ 4. Package  PresentationML zip (CPU-bound, spawn_blocking)
//!  ├─ 5. Scratch  per-request TempDir partition
//!  └─ 6. Commit   one write to the DeckStore (Drive / local / memory)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qa2deck::{server, DeckService, DriveStore, ServiceConfig};
//! use std::sync::Arc;
//!
//! #[actix_web::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder().output_folder("Create Games").build()?;
//!     let store = DriveStore::new(std::env::var("GOOGLE_DRIVE_ACCESS_TOKEN")?)?;
//!     server::run(DeckService::new(config, Arc::new(store))).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `qa2deck` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! qa2deck = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod service;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServiceConfig, ServiceConfigBuilder, TextCapacity};
pub use error::{ConfigError, ErrorKind, RenderError, ServiceError, StorageError, ValidationError};
pub use model::{
    CommitResult, CommitStatus, GenerationRequest, ProcessOutput, ProcessRequest, ProcessResponse,
    Record,
};
pub use service::{render, render_to_file, DeckService, RenderedDeck};
pub use storage::{DeckStore, DeckUpload, DriveStore, LocalStore, MemoryStore, StoredDeck};

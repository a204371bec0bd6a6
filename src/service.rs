//! Request orchestration: validated request → committed deck.
//!
//! [`DeckService`] owns the immutable configuration and the storage backend
//! and runs the pipeline stages in order. Requests share nothing else, so any
//! number can run concurrently.
//!
//! A request fails at the first stage that fails, and nothing is committed
//! unless rendering and scratch persistence both succeeded.

use crate::config::ServiceConfig;
use crate::error::{RenderError, ServiceError};
use crate::model::{CommitResult, GenerationRequest, ProcessOutput, Record};
use crate::pipeline::deck::{build_deck, Deck, DeckLayout};
use crate::pipeline::package::{write_package, PPTX_EXTENSION};
use crate::pipeline::scratch::ScratchDeck;
use crate::pipeline::template::TemplateParts;
use crate::pipeline::{commit, request};
use crate::storage::DeckStore;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde_json::Value;
use std::fmt::Write as FmtWrite;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A deck and its serialised package.
#[derive(Debug, Clone)]
pub struct RenderedDeck {
    pub deck: Deck,
    pub bytes: Vec<u8>,
}

/// The deck generation service.
#[derive(Clone)]
pub struct DeckService {
    config: Arc<ServiceConfig>,
    store: Arc<dyn DeckStore>,
}

impl DeckService {
    pub fn new(config: ServiceConfig, store: Arc<dyn DeckStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn DeckStore {
        self.store.as_ref()
    }

    /// Decode raw body bytes and run the pipeline.
    pub async fn process_body(&self, body: &[u8]) -> Result<ProcessOutput, ServiceError> {
        let request = request::decode_body(body, self.config.max_records)?;
        self.process(request).await
    }

    /// Validate a parsed JSON body and run the pipeline.
    pub async fn process_value(&self, body: &Value) -> Result<ProcessOutput, ServiceError> {
        let request = request::decode_value(body, self.config.max_records)?;
        self.process(request).await
    }

    /// Render, persist and commit one deck.
    pub async fn process(&self, request: GenerationRequest) -> Result<ProcessOutput, ServiceError> {
        let start = Instant::now();
        let GenerationRequest {
            records,
            destination,
        } = request;
        info!(
            "Generating deck: {} records → {}",
            records.len(),
            destination
        );

        // ── Step 1: Build and serialise ──────────────────────────────────
        let rendered = render(records, &self.config).await?;
        let slide_count = rendered.deck.slide_count();
        let truncated = rendered.deck.truncated_blocks();
        if truncated > 0 {
            info!("{} text block(s) truncated to fit", truncated);
        }

        // ── Step 2: Persist to scratch ───────────────────────────────────
        let file_name = deck_file_name(&self.config, Utc::now());
        let scratch =
            ScratchDeck::persist(&self.config.scratch_root(), &file_name, &rendered.bytes).await?;
        drop(rendered);

        // ── Step 3: Commit ───────────────────────────────────────────────
        let outcome = commit::commit(self.store.as_ref(), scratch, &destination, &self.config).await;
        let result = CommitResult::from_outcome(&outcome);
        if result.is_success() {
            info!(
                "Commit succeeded: {} ({} slides) in {}ms",
                result.reference.as_deref().unwrap_or_default(),
                slide_count,
                start.elapsed().as_millis()
            );
        } else {
            warn!("Commit failed for {}: {}", destination, result.detail);
        }

        let stored = outcome?;
        Ok(ProcessOutput {
            reference: stored.reference,
            file_name: stored.file_name,
            link: stored.link,
            slide_count,
        })
    }
}

/// Build the deck for `records` and serialise it.
///
/// Runs in `spawn_blocking`: template loading is file I/O and deflating the
/// package is CPU-bound.
pub async fn render(records: Vec<Record>, config: &ServiceConfig) -> Result<RenderedDeck, RenderError> {
    let layout = DeckLayout::from_config(config);
    let template_dir = config.template_dir.clone();

    tokio::task::spawn_blocking(move || {
        let template = TemplateParts::load(template_dir.as_deref())?;
        let deck = build_deck(&records, &layout);
        let bytes = write_package(&deck, &template)?;
        debug!(
            "Rendered {} slides into {} bytes",
            deck.slide_count(),
            bytes.len()
        );
        Ok(RenderedDeck { deck, bytes })
    })
    .await
    .map_err(|e| RenderError::Task(e.to_string()))?
}

/// Render `records` straight to a local file, bypassing storage.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
/// Returns the slide count.
pub async fn render_to_file(
    records: Vec<Record>,
    output_path: impl AsRef<Path>,
    config: &ServiceConfig,
) -> Result<usize, RenderError> {
    let rendered = render(records, config).await?;
    let path = output_path.as_ref();
    let output_err = |source| RenderError::Output {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(output_err)?;
    }

    let tmp_path = path.with_extension(format!("{PPTX_EXTENSION}.tmp"));
    tokio::fs::write(&tmp_path, &rendered.bytes)
        .await
        .map_err(output_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(output_err)?;

    Ok(rendered.deck.slide_count())
}

/// `{prefix}_{timestamp}.pptx`, with the timestamp in the configured offset.
pub fn deck_file_name(config: &ServiceConfig, now: DateTime<Utc>) -> String {
    let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    let local = now.with_timezone(&offset);

    let mut stamp = String::new();
    if write!(stamp, "{}", local.format(&config.timestamp_format)).is_err() {
        stamp.clear();
        let _ = write!(stamp, "{}", local.format("%Y%m%d-%H%M%S"));
    }
    let stamp: String = stamp
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
        .collect();

    format!("{}_{}.{}", config.file_prefix, stamp, PPTX_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StorageError, ValidationError};
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn service(scratch: &TempDir, store: Arc<MemoryStore>) -> DeckService {
        let config = ServiceConfig::builder()
            .scratch_dir(scratch.path())
            .build()
            .unwrap();
        DeckService::new(config, store)
    }

    fn scratch_is_empty(scratch: &TempDir) -> bool {
        std::fs::read_dir(scratch.path()).unwrap().next().is_none()
    }

    #[test]
    fn file_name_uses_prefix_and_offset() {
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 22, 5, 0).unwrap();
        let utc = ServiceConfig::default();
        assert_eq!(deck_file_name(&utc, now), "Quiz_Mar 07 10 05 PM.pptx");

        let ist = ServiceConfig::builder()
            .file_prefix("Trivia")
            .utc_offset_minutes(330)
            .build()
            .unwrap();
        assert_eq!(deck_file_name(&ist, now), "Trivia_Mar 08 03 35 AM.pptx");
    }

    #[test]
    fn file_name_never_contains_separators() {
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 22, 5, 0).unwrap();
        let config = ServiceConfig::builder()
            .timestamp_format("%D %T")
            .build()
            .unwrap();
        let name = deck_file_name(&config, now);
        assert_eq!(name, "Quiz_03-07-24 22-05-00.pptx");
    }

    #[tokio::test]
    async fn commits_one_deck_with_framing_slide() {
        let scratch = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new().with_destination("folder123"));
        let svc = service(&scratch, store.clone());

        let out = svc
            .process(GenerationRequest {
                records: vec![Record::new("Capital of France?", "Paris")],
                destination: "folder123".into(),
            })
            .await
            .unwrap();

        assert_eq!(out.slide_count, 2);
        assert!(out.file_name.starts_with("Quiz_") && out.file_name.ends_with(".pptx"));
        assert_eq!(store.files_in("folder123").len(), 1);
        assert!(scratch_is_empty(&scratch));
    }

    #[tokio::test]
    async fn validation_failure_touches_nothing() {
        let scratch = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new().with_destination("f"));
        let svc = service(&scratch, store.clone());

        let err = svc.process_body(br#"{"data": []}"#).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::MissingDestination)
        ));
        assert_eq!(store.attempts(), 0);
        assert!(scratch_is_empty(&scratch));
    }

    #[tokio::test]
    async fn storage_failure_surfaces_and_cleans_up() {
        let scratch = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let svc = service(&scratch, store.clone());

        let err = svc
            .process_body(br#"{"data": [{"question": "q", "answer": "a"}], "folderId": "ghost"}"#)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Storage(StorageError::DestinationNotFound { .. })
        ));
        assert_eq!(err.status_code(), 502);
        assert!(scratch_is_empty(&scratch));
    }

    #[tokio::test]
    async fn broken_template_is_render_error_and_skips_commit() {
        let scratch = TempDir::new().unwrap();
        let templates = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new().with_destination("f"));
        let config = ServiceConfig::builder()
            .scratch_dir(scratch.path())
            .template_dir(templates.path())
            .build()
            .unwrap();
        let svc = DeckService::new(config, store.clone());

        let err = svc
            .process_value(&serde_json::json!({"data": [], "folderId": "f"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Render(RenderError::TemplateMissing { .. })));
        assert_eq!(store.attempts(), 0);
    }

    #[tokio::test]
    async fn render_to_file_writes_pptx() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("decks").join("quiz.pptx");
        let n = render_to_file(
            vec![Record::new("q1", "a1"), Record::new("q2", "a2")],
            &out,
            &ServiceConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(n, 3);
        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert!(!dir.path().join("decks").join("quiz.pptx.tmp").exists());
    }
}

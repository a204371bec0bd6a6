//! Service configuration.
//!
//! Every knob lives in [`ServiceConfig`], built via [`ServiceConfigBuilder`].
//! The config is immutable once built and shared behind an `Arc` by all
//! request handlers; nothing in it changes per request.
//!
//! Slide text capacity is configuration, not something learned from content:
//! the same [`TextCapacity`] applies to every record so truncation is
//! reproducible across runs.

use crate::error::ConfigError;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Character and line budget for one text block on a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextCapacity {
    /// Maximum characters (Unicode scalar values), including the ellipsis.
    pub max_chars: usize,
    /// Maximum lines after normalisation.
    pub max_lines: usize,
}

impl TextCapacity {
    pub const fn new(max_chars: usize, max_lines: usize) -> Self {
        Self {
            max_chars,
            max_lines,
        }
    }

    /// Question block: 32 pt bold across the top third of a 16:9 slide.
    pub const QUESTION: TextCapacity = TextCapacity::new(200, 4);

    /// Answer block: 24 pt in the lower two thirds.
    pub const ANSWER: TextCapacity = TextCapacity::new(700, 12);
}

/// Configuration for the deck generation service.
///
/// # Example
/// ```rust
/// use qa2deck::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .port(9000)
///     .deck_title("Friday Quiz")
///     .output_folder("Create Games")
///     .build()
///     .unwrap();
/// assert_eq!(config.port, 9000);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Interface to bind. Default: `0.0.0.0`.
    pub host: String,

    /// TCP port. Default: 8111.
    pub port: u16,

    /// Parent directory for per-request scratch partitions. Default: system temp dir.
    pub scratch_dir: Option<PathBuf>,

    /// Directory holding `slideMaster1.xml`, `slideLayout1.xml` and
    /// `theme1.xml` overrides. Default: built-in parts.
    pub template_dir: Option<PathBuf>,

    /// Title on the framing slide. Default: "Questions & Answers".
    pub deck_title: String,

    /// Subtitle on the framing slide. Default: empty (no subtitle block).
    pub deck_subtitle: String,

    /// Leading part of the generated file name. Default: "Quiz".
    pub file_prefix: String,

    /// `chrono` format string for the file-name timestamp. Default: `%b %d %I %M %p`.
    pub timestamp_format: String,

    /// Fixed UTC offset (minutes) used for the file-name timestamp. Default: 0.
    pub utc_offset_minutes: i32,

    /// Capacity of the question block.
    pub question_capacity: TextCapacity,

    /// Capacity of the answer block.
    pub answer_capacity: TextCapacity,

    /// Upper bound on records per request. Default: 1000.
    pub max_records: usize,

    /// Upper bound on the request body in bytes. Default: 4 MiB.
    pub max_body_bytes: usize,

    /// Deadline for the single storage write attempt. Default: 60.
    pub storage_timeout_secs: u64,

    /// Subfolder (created if absent) inside the destination to hold decks.
    pub output_folder: Option<String>,

    /// Grant "anyone with the link can view" after upload. Default: false.
    pub share_publicly: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8111,
            scratch_dir: None,
            template_dir: None,
            deck_title: "Questions & Answers".to_string(),
            deck_subtitle: String::new(),
            file_prefix: "Quiz".to_string(),
            timestamp_format: "%b %d %I %M %p".to_string(),
            utc_offset_minutes: 0,
            question_capacity: TextCapacity::QUESTION,
            answer_capacity: TextCapacity::ANSWER,
            max_records: 1000,
            max_body_bytes: 4 * 1024 * 1024,
            storage_timeout_secs: 60,
            output_folder: None,
            share_publicly: false,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// `host:port` for `HttpServer::bind`.
    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    /// Scratch parent directory, falling back to the system temp dir.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.template_dir = Some(dir.into());
        self
    }

    pub fn deck_title(mut self, title: impl Into<String>) -> Self {
        self.config.deck_title = title.into();
        self
    }

    pub fn deck_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.config.deck_subtitle = subtitle.into();
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    pub fn timestamp_format(mut self, fmt: impl Into<String>) -> Self {
        self.config.timestamp_format = fmt.into();
        self
    }

    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.config.utc_offset_minutes = minutes.clamp(-14 * 60, 14 * 60);
        self
    }

    pub fn question_capacity(mut self, capacity: TextCapacity) -> Self {
        self.config.question_capacity = capacity;
        self
    }

    pub fn answer_capacity(mut self, capacity: TextCapacity) -> Self {
        self.config.answer_capacity = capacity;
        self
    }

    pub fn max_records(mut self, n: usize) -> Self {
        self.config.max_records = n;
        self
    }

    pub fn max_body_bytes(mut self, n: usize) -> Self {
        self.config.max_body_bytes = n.max(1024);
        self
    }

    pub fn storage_timeout_secs(mut self, secs: u64) -> Self {
        self.config.storage_timeout_secs = secs.max(1);
        self
    }

    pub fn output_folder(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.config.output_folder = if name.trim().is_empty() {
            None
        } else {
            Some(name)
        };
        self
    }

    pub fn share_publicly(mut self, v: bool) -> Self {
        self.config.share_publicly = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ConfigError> {
        let c = &self.config;
        for (name, cap) in [
            ("question", c.question_capacity),
            ("answer", c.answer_capacity),
        ] {
            if cap.max_chars < 2 || cap.max_lines < 1 {
                return Err(ConfigError(format!(
                    "{name} capacity must allow at least 2 chars and 1 line, got {}/{}",
                    cap.max_chars, cap.max_lines
                )));
            }
        }
        if c.max_records == 0 {
            return Err(ConfigError("max_records must be ≥ 1".into()));
        }
        if c.file_prefix.trim().is_empty() {
            return Err(ConfigError("file_prefix must not be empty".into()));
        }
        if c.file_prefix.contains(['/', '\\']) {
            return Err(ConfigError(format!(
                "file_prefix must not contain path separators, got '{}'",
                c.file_prefix
            )));
        }
        if StrftimeItems::new(&c.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError(format!(
                "timestamp_format '{}' is not a valid strftime format",
                c.timestamp_format
            )));
        }
        if c.timestamp_format.contains(['/', '\\']) {
            return Err(ConfigError(
                "timestamp_format must not produce path separators".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ServiceConfig::default();
        assert_eq!(c.port, 8111);
        assert_eq!(c.host, "0.0.0.0");
        assert_eq!(c.question_capacity, TextCapacity::QUESTION);
        assert_eq!(c.answer_capacity, TextCapacity::ANSWER);
        assert!(!c.share_publicly);
        assert!(c.output_folder.is_none());
    }

    #[test]
    fn builder_clamps() {
        let c = ServiceConfig::builder()
            .storage_timeout_secs(0)
            .max_body_bytes(10)
            .utc_offset_minutes(-100_000)
            .build()
            .unwrap();
        assert_eq!(c.storage_timeout_secs, 1);
        assert_eq!(c.max_body_bytes, 1024);
        assert_eq!(c.utc_offset_minutes, -14 * 60);
    }

    #[test]
    fn blank_output_folder_is_none() {
        let c = ServiceConfig::builder().output_folder("  ").build().unwrap();
        assert!(c.output_folder.is_none());
    }

    #[test]
    fn rejects_tiny_capacity() {
        let err = ServiceConfig::builder()
            .answer_capacity(TextCapacity::new(1, 1))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("answer"));
    }

    #[test]
    fn rejects_prefix_with_separator() {
        assert!(ServiceConfig::builder()
            .file_prefix("../evil")
            .build()
            .is_err());
        assert!(ServiceConfig::builder().file_prefix("").build().is_err());
    }

    #[test]
    fn rejects_bad_timestamp_format() {
        let err = ServiceConfig::builder()
            .timestamp_format("%Q")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("strftime"));
    }

    #[test]
    fn rejects_zero_max_records() {
        assert!(ServiceConfig::builder().max_records(0).build().is_err());
    }
}

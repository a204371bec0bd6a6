//! Error types for the qa2deck service.
//!
//! Three error kinds map onto the three pipeline stages:
//!
//! * [`ValidationError`]: the request body is malformed or lacks a
//!   destination. Raised before any deck is built.
//! * [`RenderError`]: the deck could not be produced for a structural reason
//!   (template override missing or corrupt, package writer failure, scratch
//!   I/O). Never raised for the *content* of a record.
//! * [`StorageError`]: the finished deck could not be committed.
//!
//! [`ServiceError`] wraps all three so the request handler has a single type
//! to convert into a structured failure response. Per-record oddities (empty
//! cells, numbers, huge answers) are deliberately not errors; they degrade
//! into rendered text.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// The error taxonomy surfaced to callers as `errorKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ValidationError,
    RenderError,
    StorageError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::RenderError => "RenderError",
            ErrorKind::StorageError => "StorageError",
        }
    }
}

/// Any failure of a `/process` request.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::ValidationError,
            ServiceError::Render(_) => ErrorKind::RenderError,
            ServiceError::Storage(_) => ErrorKind::StorageError,
        }
    }

    /// Whether a caller may reasonably retry the same request.
    ///
    /// Only transport-level storage failures qualify. A timeout is reported
    /// retryable even though the destination may already hold the deck.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// HTTP status used for the failure response.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation(ValidationError::PayloadTooLarge { .. }) => 413,
            ServiceError::Validation(_) => 400,
            ServiceError::Render(_) => 500,
            ServiceError::Storage(StorageError::Timeout { .. }) => 504,
            ServiceError::Storage(_) => 502,
        }
    }
}

// ── Validation ──────────────────────────────────────────────────────────────

/// The request could not be turned into a `GenerationRequest`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Malformed JSON payload: {detail}")]
    MalformedJson { detail: String },

    #[error("Request body must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    #[error("Missing 'data' field: expected an array of {{question, answer}} records")]
    MissingRecords,

    #[error("Invalid 'data' field: expected an array of records, got {found}")]
    RecordsNotASequence { found: &'static str },

    #[error("Invalid or missing 'folderId' in request data.")]
    MissingDestination,

    #[error("Invalid 'folderId': must be a string, got {found}.")]
    DestinationNotAString { found: &'static str },

    #[error("Too many records: {count} (limit is {max})")]
    TooManyRecords { count: usize, max: usize },

    #[error("Request body exceeds the {limit}-byte limit")]
    PayloadTooLarge { limit: usize },
}

// ── Render ──────────────────────────────────────────────────────────────────

/// Structural failure while building or serialising the deck.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A template override file could not be read.
    #[error("Slide template '{path}' is missing or unreadable: {source}")]
    TemplateMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template override file is not well-formed XML.
    #[error("Slide template '{path}' is corrupt: {detail}")]
    TemplateCorrupt { path: PathBuf, detail: String },

    /// The zip/XML package writer failed.
    #[error("Failed to write presentation package: {0}")]
    Package(String),

    /// The per-request scratch area could not be created or written.
    #[error("Scratch storage failure at '{path}': {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rendered deck could not be written to its output path.
    #[error("Failed to write output file '{path}': {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking render task panicked or was cancelled.
    #[error("Render task failed: {0}")]
    Task(String),
}

impl From<zip::result::ZipError> for RenderError {
    fn from(e: zip::result::ZipError) -> Self {
        RenderError::Package(e.to_string())
    }
}

// ── Storage ─────────────────────────────────────────────────────────────────

/// Failure to commit the deck to its destination.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// The destination identifier does not resolve to anything.
    #[error("Destination '{destination}' was not found")]
    DestinationNotFound { destination: String },

    /// The destination exists but cannot be written to.
    #[error("Destination '{destination}' is not writable: {detail}")]
    DestinationNotWritable { destination: String, detail: String },

    /// The identifier is syntactically unusable for this backend.
    #[error("Destination '{destination}' is invalid: {reason}")]
    InvalidDestination { destination: String, reason: String },

    /// The storage service could not be reached.
    #[error("Storage service unreachable: {detail}")]
    Unreachable { detail: String },

    /// The single write attempt did not finish in time. The deck may or may
    /// not exist at the destination.
    #[error("Storage write timed out after {secs}s; the destination may or may not contain the deck")]
    Timeout { secs: u64 },

    /// The storage service answered with an error status.
    #[error("Storage service rejected the write (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// Local filesystem failure inside a storage backend.
    #[error("Storage I/O failure: {detail}")]
    Io { detail: String },
}

impl StorageError {
    /// `true` for transport failures, `false` for bad destinations.
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::Unreachable { .. } | StorageError::Timeout { .. } => true,
            StorageError::Rejected { status, .. } => *status == 429 || *status >= 500,
            StorageError::DestinationNotFound { .. }
            | StorageError::DestinationNotWritable { .. }
            | StorageError::InvalidDestination { .. }
            | StorageError::Io { .. } => false,
        }
    }
}

// ── Config ──────────────────────────────────────────────────────────────────

/// Builder validation failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid configuration: {0}")]
pub struct ConfigError(pub String);

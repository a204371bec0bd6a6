//! Request, record and result types.
//!
//! Wire types (`ProcessRequest`, `ProcessResponse`) use the camelCase field
//! names the spreadsheet client sends and expects. Everything else is the
//! validated, in-process form.

use crate::error::{ErrorKind, ServiceError, StorageError};
use crate::storage::StoredDeck;
use serde::{Deserialize, Serialize};

/// One question/answer pair. Both fields are plain text after coercion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub question: String,
    pub answer: String,
}

impl Record {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A validated request: ordered records plus a non-empty destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub records: Vec<Record>,
    pub destination: String,
}

/// The body a client POSTs to `/process`.
///
/// The server never deserialises into this type directly (it validates a raw
/// `serde_json::Value` so it can coerce odd cells); clients use it to build
/// well-formed requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub data: Vec<Record>,
    pub folder_id: Option<String>,
}

/// Outcome of a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitStatus {
    Success,
    Failure,
}

/// Produced once per request for logging; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitResult {
    pub reference: Option<String>,
    pub status: CommitStatus,
    pub detail: String,
}

impl CommitResult {
    pub fn from_outcome(outcome: &Result<StoredDeck, StorageError>) -> Self {
        match outcome {
            Ok(stored) => CommitResult {
                reference: Some(stored.reference.clone()),
                status: CommitStatus::Success,
                detail: format!("placed '{}'", stored.file_name),
            },
            Err(e) => CommitResult {
                reference: None,
                status: CommitStatus::Failure,
                detail: e.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CommitStatus::Success
    }
}

/// Successful `/process` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutput {
    /// Storage-specific identifier of the committed deck.
    pub reference: String,
    pub file_name: String,
    /// Human-openable link, when the backend provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Framing slide plus one slide per record.
    pub slide_count: usize,
}

/// JSON body returned by `/process`, success or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessResponse {
    #[serde(rename_all = "camelCase")]
    Success {
        success: SuccessFlag<true>,
        reference: String,
        file_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        link: Option<String>,
        slide_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    Failure {
        success: SuccessFlag<false>,
        error_kind: String,
        detail: String,
        retryable: bool,
    },
}

impl ProcessResponse {
    pub fn success(output: ProcessOutput) -> Self {
        ProcessResponse::Success {
            success: SuccessFlag,
            reference: output.reference,
            file_name: output.file_name,
            link: output.link,
            slide_count: output.slide_count,
        }
    }

    pub fn failure(error: &ServiceError) -> Self {
        Self::failure_parts(error.kind(), error.to_string(), error.is_retryable())
    }

    pub fn failure_parts(kind: ErrorKind, detail: String, retryable: bool) -> Self {
        ProcessResponse::Failure {
            success: SuccessFlag,
            error_kind: kind.as_str().to_string(),
            detail,
            retryable,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProcessResponse::Success { .. })
    }
}

/// A `bool` that only (de)serialises as the constant `B`.
///
/// Lets the untagged [`ProcessResponse`] pick the right variant from the
/// `success` field alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuccessFlag<const B: bool>;

impl<const B: bool> Serialize for SuccessFlag<B> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(B)
    }
}

impl<'de, const B: bool> Deserialize<'de> for SuccessFlag<B> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = bool::deserialize(deserializer)?;
        if v == B {
            Ok(SuccessFlag)
        } else {
            Err(serde::de::Error::custom(format!("expected success={B}")))
        }
    }
}

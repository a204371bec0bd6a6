//! Spreadsheet-side client: sheet rows → `/process` request.
//!
//! A sheet export is a JSON array of rows (the shape of a `getValues()`
//! range): the first row holds headers, the rest hold cells. The `Question`
//! and `Answer` columns are located by header name, case-insensitively, so
//! column order and extra columns do not matter.

use crate::model::{ProcessRequest, ProcessResponse, Record};
use crate::pipeline::request::coerce_text;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const QUESTION_HEADER: &str = "question";
pub const ANSWER_HEADER: &str = "answer";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Sheet is empty: expected a header row")]
    EmptySheet,

    #[error("Sheet has no '{0}' column")]
    MissingColumn(&'static str),

    #[error("Sheet export must be a JSON array of rows: {0}")]
    BadSheet(String),

    #[error("Request to {url} failed: {detail}")]
    Http { url: String, detail: String },

    #[error("Unexpected response from {url} (HTTP {status}): {body}")]
    UnexpectedResponse {
        url: String,
        status: u16,
        body: String,
    },
}

/// Parse a sheet export (`[[header, …], [cell, …], …]`).
pub fn parse_sheet(json: &str) -> Result<Vec<Vec<Value>>, ClientError> {
    serde_json::from_str(json).map_err(|e| ClientError::BadSheet(e.to_string()))
}

/// Build a request from sheet rows.
///
/// Rows where both the question and the answer cell are blank are skipped
/// (sheet ranges usually include trailing empty rows). `folder_id` is passed
/// through untouched; the service validates it.
pub fn build_request(
    rows: &[Vec<Value>],
    folder_id: Option<&str>,
) -> Result<ProcessRequest, ClientError> {
    let (headers, body) = rows.split_first().ok_or(ClientError::EmptySheet)?;
    let q_col = find_column(headers, QUESTION_HEADER)?;
    let a_col = find_column(headers, ANSWER_HEADER)?;

    let data: Vec<Record> = body
        .iter()
        .map(|row| Record {
            question: coerce_text(row.get(q_col)),
            answer: coerce_text(row.get(a_col)),
        })
        .filter(|r| !(r.question.trim().is_empty() && r.answer.trim().is_empty()))
        .collect();

    debug!(
        "Built request: {} records from {} rows",
        data.len(),
        body.len()
    );
    Ok(ProcessRequest {
        data,
        folder_id: folder_id.map(str::to_string),
    })
}

fn find_column(headers: &[Value], name: &'static str) -> Result<usize, ClientError> {
    headers
        .iter()
        .position(|h| coerce_text(Some(h)).trim().eq_ignore_ascii_case(name))
        .ok_or(ClientError::MissingColumn(name))
}

/// POST `request` to `url` and decode the JSON answer.
///
/// Failure bodies (4xx/5xx with `success: false`) decode into
/// [`ProcessResponse::Failure`] rather than an error; only transport failures
/// and unrecognisable bodies are [`ClientError`]s.
pub async fn submit(
    url: &str,
    request: &ProcessRequest,
    timeout: Duration,
) -> Result<ProcessResponse, ClientError> {
    let http_err = |e: reqwest::Error| ClientError::Http {
        url: url.to_string(),
        detail: e.to_string(),
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(http_err)?;

    info!("Submitting {} records to {}", request.data.len(), url);
    let response = client
        .post(url)
        .json(request)
        .send()
        .await
        .map_err(http_err)?;

    let status = response.status().as_u16();
    let body = response.text().await.map_err(http_err)?;
    serde_json::from_str::<ProcessResponse>(&body).map_err(|_| ClientError::UnexpectedResponse {
        url: url.to_string(),
        status,
        body: body.chars().take(500).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(v: Value) -> Vec<Vec<Value>> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn maps_columns_by_header() {
        let sheet = rows(json!([
            ["#", "Answer", "QUESTION "],
            [1, "Paris", "Capital of France?"],
            [2, 4, "2+2"]
        ]));
        let req = build_request(&sheet, Some("folder123")).unwrap();
        assert_eq!(
            req.data,
            vec![
                Record::new("Capital of France?", "Paris"),
                Record::new("2+2", "4"),
            ]
        );
        assert_eq!(req.folder_id.as_deref(), Some("folder123"));
    }

    #[test]
    fn blank_rows_skipped_short_rows_padded() {
        let sheet = rows(json!([
            ["Question", "Answer"],
            ["only a question"],
            ["", ""],
            [null, "only an answer"]
        ]));
        let req = build_request(&sheet, None).unwrap();
        assert_eq!(
            req.data,
            vec![
                Record::new("only a question", ""),
                Record::new("", "only an answer"),
            ]
        );
        assert!(req.folder_id.is_none());
    }

    #[test]
    fn missing_column_reported() {
        let sheet = rows(json!([["Question", "Notes"], ["q", "n"]]));
        let err = build_request(&sheet, Some("f")).unwrap_err();
        assert!(matches!(err, ClientError::MissingColumn("answer")));
    }

    #[test]
    fn empty_sheet_reported() {
        assert!(matches!(
            build_request(&[], Some("f")).unwrap_err(),
            ClientError::EmptySheet
        ));
    }

    #[test]
    fn header_only_sheet_is_empty_request() {
        let sheet = rows(json!([["Question", "Answer"]]));
        assert!(build_request(&sheet, Some("f")).unwrap().data.is_empty());
    }

    #[test]
    fn parse_sheet_rejects_non_rows() {
        assert!(matches!(
            parse_sheet(r#"{"a": 1}"#).unwrap_err(),
            ClientError::BadSheet(_)
        ));
        assert_eq!(parse_sheet(r#"[["Question"]]"#).unwrap().len(), 1);
    }
}

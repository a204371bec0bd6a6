//! Request decoding: raw JSON body → validated [`GenerationRequest`].
//!
//! Request-level problems (no `data` array, no destination) are rejected with
//! a [`ValidationError`]. Record-level problems are not: a row with a numeric
//! answer, a missing question, or even a non-object entry still produces a
//! slide, so one odd row never blocks the rest of the batch.

use crate::error::ValidationError;
use crate::model::{GenerationRequest, Record};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Parse raw body bytes and validate them.
pub fn decode_body(body: &[u8], max_records: usize) -> Result<GenerationRequest, ValidationError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ValidationError::MalformedJson {
            detail: e.to_string(),
        })?;
    decode_value(&value, max_records)
}

/// Validate an already-parsed JSON body.
pub fn decode_value(value: &Value, max_records: usize) -> Result<GenerationRequest, ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject {
        found: json_type(value),
    })?;

    // Destination first: a request that cannot be placed anywhere is rejected
    // regardless of what its records look like.
    let destination = extract_destination(obj)?;
    let records = extract_records(obj, max_records)?;

    debug!(
        "Decoded request: {} records → '{}'",
        records.len(),
        destination
    );

    Ok(GenerationRequest {
        records,
        destination,
    })
}

fn extract_destination(obj: &Map<String, Value>) -> Result<String, ValidationError> {
    match obj.get("folderId") {
        None | Some(Value::Null) => Err(ValidationError::MissingDestination),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(ValidationError::MissingDestination)
            } else {
                Ok(trimmed.to_string())
            }
        }
        Some(other) => Err(ValidationError::DestinationNotAString {
            found: json_type(other),
        }),
    }
}

fn extract_records(
    obj: &Map<String, Value>,
    max_records: usize,
) -> Result<Vec<Record>, ValidationError> {
    match obj.get("data") {
        None | Some(Value::Null) => Err(ValidationError::MissingRecords),
        Some(data) => decode_records(data, max_records),
    }
}

/// Coerce a `data` array into records. Used directly by callers that have
/// records but no destination (local rendering).
pub fn decode_records(data: &Value, max_records: usize) -> Result<Vec<Record>, ValidationError> {
    let entries = data.as_array().ok_or(ValidationError::RecordsNotASequence {
        found: json_type(data),
    })?;

    if entries.len() > max_records {
        return Err(ValidationError::TooManyRecords {
            count: entries.len(),
            max: max_records,
        });
    }

    Ok(entries
        .iter()
        .enumerate()
        .map(|(i, entry)| coerce_record(i, entry))
        .collect())
}

/// Turn one `data` entry into a record, never failing.
fn coerce_record(index: usize, entry: &Value) -> Record {
    match entry {
        Value::Object(fields) => Record {
            question: coerce_text(fields.get("question")),
            answer: coerce_text(fields.get("answer")),
        },
        other => {
            warn!(
                "Record {} is a {} rather than an object; rendering an empty slide",
                index,
                json_type(other)
            );
            Record::default()
        }
    }
}

/// Coerce any JSON value to slide text.
///
/// Strings pass through; numbers and booleans use their JSON spelling; null
/// and absent become empty; arrays and objects become compact JSON.
pub fn coerce_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MAX: usize = 1000;

    #[test]
    fn decodes_well_formed_request() {
        let req = decode_value(
            &json!({
                "data": [{"question": "Capital of France?", "answer": "Paris"}],
                "folderId": "folder123"
            }),
            MAX,
        )
        .unwrap();
        assert_eq!(req.destination, "folder123");
        assert_eq!(req.records, vec![Record::new("Capital of France?", "Paris")]);
    }

    #[test]
    fn empty_data_is_valid() {
        let req = decode_value(&json!({"data": [], "folderId": "f"}), MAX).unwrap();
        assert!(req.records.is_empty());
    }

    #[test]
    fn malformed_json_rejected() {
        let err = decode_body(b"{'key': 'value',", MAX).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedJson { .. }));
        assert!(err.to_string().starts_with("Malformed JSON payload"));
    }

    #[test]
    fn non_object_body_rejected() {
        let err = decode_value(&json!([1, 2]), MAX).unwrap_err();
        assert_eq!(err, ValidationError::NotAnObject { found: "array" });
    }

    #[test]
    fn null_missing_or_blank_destination_rejected() {
        for body in [
            json!({"data": []}),
            json!({"data": [], "folderId": null}),
            json!({"data": [], "folderId": ""}),
            json!({"data": [], "folderId": "   "}),
        ] {
            assert_eq!(
                decode_value(&body, MAX).unwrap_err(),
                ValidationError::MissingDestination,
                "body: {body}"
            );
        }
    }

    #[test]
    fn non_string_destination_rejected() {
        let err = decode_value(
            &json!({"folderId": 123, "data": [{"question": "q", "answer": "a"}]}),
            MAX,
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::DestinationNotAString { found: "number" });
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn missing_or_wrong_type_data_rejected() {
        assert_eq!(
            decode_value(&json!({"folderId": "f"}), MAX).unwrap_err(),
            ValidationError::MissingRecords
        );
        assert_eq!(
            decode_value(&json!({"folderId": "f", "data": null}), MAX).unwrap_err(),
            ValidationError::MissingRecords
        );
        assert_eq!(
            decode_value(&json!({"folderId": "f", "data": {"question": "q"}}), MAX).unwrap_err(),
            ValidationError::RecordsNotASequence { found: "object" }
        );
    }

    #[test]
    fn destination_checked_before_records() {
        let err = decode_value(&json!({"data": "nope"}), MAX).unwrap_err();
        assert_eq!(err, ValidationError::MissingDestination);
    }

    #[test]
    fn too_many_records_rejected() {
        let data: Vec<Value> = (0..3).map(|i| json!({"question": i, "answer": i})).collect();
        let err = decode_value(&json!({"folderId": "f", "data": data}), 2).unwrap_err();
        assert_eq!(err, ValidationError::TooManyRecords { count: 3, max: 2 });
    }

    #[test]
    fn odd_records_are_coerced_not_rejected() {
        let req = decode_value(
            &json!({
                "folderId": "f",
                "data": [
                    {"question": 42, "answer": 3.5},
                    {"question": true, "answer": null},
                    {},
                    {"answer": "only answer"},
                    "not an object",
                    {"question": ["a", 1], "answer": {"k": "v"}}
                ]
            }),
            MAX,
        )
        .unwrap();

        assert_eq!(
            req.records,
            vec![
                Record::new("42", "3.5"),
                Record::new("true", ""),
                Record::new("", ""),
                Record::new("", "only answer"),
                Record::new("", ""),
                Record::new(r#"["a",1]"#, r#"{"k":"v"}"#),
            ]
        );
    }

    #[test]
    fn bare_record_array_decodes() {
        let records = decode_records(&json!([{"question": "q", "answer": 1}]), MAX).unwrap();
        assert_eq!(records, vec![Record::new("q", "1")]);
        assert_eq!(
            decode_records(&json!("x"), MAX).unwrap_err(),
            ValidationError::RecordsNotASequence { found: "string" }
        );
    }

    #[test]
    fn order_and_duplicates_preserved() {
        let req = decode_value(
            &json!({
                "folderId": "f",
                "data": [
                    {"question": "b", "answer": "2"},
                    {"question": "a", "answer": "1"},
                    {"question": "b", "answer": "2"}
                ]
            }),
            MAX,
        )
        .unwrap();
        let questions: Vec<&str> = req.records.iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, vec!["b", "a", "b"]);
    }
}

//! Google Drive v3 backend.
//!
//! Uploads use a single `multipart/related` request (metadata + content), so
//! a deck is either fully created or not created at all. The destination is a
//! Drive folder id. Authentication is a bearer access token obtained outside
//! this process (for example `gcloud auth print-access-token` or a token
//! broker in front of a service account).
//!
//! ```text
//! [subfolder?] GET  /drive/v3/files?q=name='…' and '<dest>' in parents
//!              POST /drive/v3/files                      (create if absent)
//!              POST /upload/drive/v3/files?uploadType=multipart
//! [share?]     POST /drive/v3/files/<id>/permissions     (anyone, reader)
//! ```

use crate::error::StorageError;
use crate::storage::{check_identifier, DeckStore, DeckUpload, StoredDeck};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: Option<String>,
    #[serde(rename = "webViewLink")]
    web_view_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

pub struct DriveStore {
    client: reqwest::Client,
    access_token: String,
    api_base: String,
    upload_base: String,
}

impl DriveStore {
    pub fn new(access_token: impl Into<String>) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| StorageError::Unreachable {
                detail: format!("HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            access_token: access_token.into(),
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: DRIVE_UPLOAD_BASE.to_string(),
        })
    }

    /// Point the store at different API roots (proxies, fakes).
    pub fn with_endpoints(mut self, api_base: impl Into<String>, upload_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.upload_base = upload_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Id of the folder `name` inside `parent`, creating it when absent.
    async fn find_or_create_folder(&self, parent: &str, name: &str) -> Result<String, StorageError> {
        let q = format!(
            "name = '{}' and mimeType = '{FOLDER_MIME}' and '{}' in parents and trashed = false",
            escape_query(name),
            escape_query(parent)
        );
        let response = self
            .client
            .get(format!("{}/files", self.api_base))
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", q.as_str()),
                ("fields", "files(id, name)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await
            .map_err(transport_error)?;
        let list: FileList = decode(response, parent).await?;

        if let Some(existing) = list.files.into_iter().next() {
            debug!("Found folder '{}' ({}) in {}", name, existing.id, parent);
            return Ok(existing.id);
        }

        let response = self
            .client
            .post(format!("{}/files", self.api_base))
            .bearer_auth(&self.access_token)
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .json(&json!({
                "name": name,
                "mimeType": FOLDER_MIME,
                "parents": [parent],
            }))
            .send()
            .await
            .map_err(transport_error)?;
        let created: DriveFile = decode(response, parent).await?;
        info!("Created folder '{}' ({}) in {}", name, created.id, parent);
        Ok(created.id)
    }

    async fn upload(&self, parent: &str, upload: &DeckUpload) -> Result<DriveFile, StorageError> {
        let boundary = format!("qa2deck-{}", uuid::Uuid::new_v4().simple());
        let metadata = json!({
            "name": upload.file_name,
            "parents": [parent],
            "mimeType": upload.content_type,
        });
        let body = multipart_related(&boundary, &metadata, upload.content_type, &upload.bytes);

        let response = self
            .client
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&self.access_token)
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", "id,name,webViewLink"),
            ])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response, parent).await
    }

    async fn share(&self, file_id: &str) -> Result<(), StorageError> {
        let response = self
            .client
            .post(format!("{}/files/{}/permissions", self.api_base, file_id))
            .bearer_auth(&self.access_token)
            .query(&[("supportsAllDrives", "true")])
            .json(&json!({ "type": "anyone", "role": "reader" }))
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(classify_status(status.as_u16(), file_id, &body))
        }
    }
}

#[async_trait]
impl DeckStore for DriveStore {
    fn name(&self) -> &'static str {
        "drive"
    }

    async fn place(&self, upload: DeckUpload) -> Result<StoredDeck, StorageError> {
        check_identifier(&upload.destination, &upload.destination)?;

        let parent = match &upload.subfolder {
            Some(name) => self.find_or_create_folder(&upload.destination, name).await?,
            None => upload.destination.clone(),
        };

        let file = self.upload(&parent, &upload).await?;
        info!(
            "Uploaded '{}' to Drive folder {} as {}",
            upload.file_name, parent, file.id
        );

        // The deck is already committed; a failed share only loses the link.
        if upload.share_publicly {
            if let Err(e) = self.share(&file.id).await {
                warn!("Could not share {} publicly: {}", file.id, e);
            }
        }

        Ok(StoredDeck {
            reference: file.id,
            file_name: file.name.unwrap_or(upload.file_name),
            link: file.web_view_link,
        })
    }
}

// ── Wire helpers ─────────────────────────────────────────────────────────────

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    destination: &str,
) -> Result<T, StorageError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify_status(status.as_u16(), destination, &body));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| StorageError::Rejected {
            status: status.as_u16(),
            detail: format!("unexpected response body: {e}"),
        })
}

fn transport_error(e: reqwest::Error) -> StorageError {
    let detail = if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    };
    StorageError::Unreachable { detail }
}

/// Map a Drive error status to a [`StorageError`].
fn classify_status(status: u16, destination: &str, body: &str) -> StorageError {
    let message = drive_error_message(body);
    match status {
        404 => StorageError::DestinationNotFound {
            destination: destination.to_string(),
        },
        401 | 403 => StorageError::DestinationNotWritable {
            destination: destination.to_string(),
            detail: message,
        },
        400 => StorageError::InvalidDestination {
            destination: destination.to_string(),
            reason: message,
        },
        _ => StorageError::Rejected {
            status,
            detail: message,
        },
    }
}

/// `error.message` from a Drive error body, or a clipped raw body.
fn drive_error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = v.pointer("/error/message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no details".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

/// Escape a literal for a Drive `q` expression.
fn escape_query(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    content_type: &str,
    bytes: &[u8],
) -> Vec<u8> {
    let head = format!(
        "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
         --{boundary}\r\nContent-Type: {content_type}\r\n\r\n"
    );
    let tail = format!("\r\n--{boundary}--\r\n");
    let mut body = Vec::with_capacity(head.len() + bytes.len() + tail.len());
    body.extend_from_slice(head.as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(tail.as_bytes());
    body
}

//! Wire DTOs for the companion app's recording endpoints. Field names and
//! casing follow the HTTP contract exactly, so every rename lives here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StartSessionRequest {
    pub filename: String,
    pub multipart_upload_id: Option<String>,
    pub provider_file_id: Option<String>,
    pub started_at_ms: i64,
    pub mime_type: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StartSessionResponse {
    pub recording_id: String,
}

/// Incremental progress report. Wasabi reports per part, Google Drive per
/// accepted byte range; the endpoint distinguishes them by shape.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ProgressUpdate {
    Part {
        part_number: u32,
        etag: String,
        part_size_bytes: u64,
        ended_at_ms: i64,
    },
    Chunk {
        chunk_size_bytes: u64,
        ended_at_ms: i64,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MultipartCreateRequest {
    pub filename: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
    pub room_id: String,
    pub started_at_ms: i64,
    pub ended_at_ms: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MultipartCreated {
    #[serde(rename = "uploadId")]
    pub upload_id: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SignPartRequest {
    #[serde(rename = "uploadId")]
    pub upload_id: String,
    pub key: String,
    #[serde(rename = "partNumber")]
    pub part_number: u32,
    pub room_id: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SignedPartUrl {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletedPart {
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    #[serde(rename = "ETag")]
    pub etag: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MultipartCompleteRequest {
    #[serde(rename = "uploadId")]
    pub upload_id: String,
    pub key: String,
    pub parts: Vec<CompletedPart>,
    pub room_id: String,
    pub filename: String,
    pub size_bytes: u64,
    pub started_at_ms: i64,
    pub ended_at_ms: i64,
    pub mime: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MultipartCompleted {
    pub recording_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MultipartAbortRequest {
    #[serde(rename = "uploadId")]
    pub upload_id: String,
    pub key: String,
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DriveSessionRequest {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub metadata: DriveSessionMetadata,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DriveSessionMetadata {
    pub started_at_ms: i64,
    pub ended_at_ms: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DriveSession {
    pub session_uri: String,
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DriveConfirmRequest {
    pub session_uri: String,
    pub file_id: String,
    pub metadata: DriveConfirmMetadata,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DriveConfirmMetadata {
    pub filename: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DriveConfirmed {
    pub recording_id: String,
    pub provider_file_id: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

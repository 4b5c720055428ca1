use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::providers::StorageProvider;

/// Metadata captured once when a recording starts. The room id and MIME type
/// come from the room's configuration and are treated as opaque here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingMetadata {
    pub room_id: String,
    pub filename: Option<String>,
    pub mime_type: String,
    pub started_at: DateTime<Utc>,
}

impl RecordingMetadata {
    pub fn started_at_ms(&self) -> i64 {
        self.started_at.timestamp_millis()
    }

    /// The filename used on the wire and for local artifacts. Falls back to
    /// `recording.<ext>` with the extension derived from the declared MIME.
    pub fn resolved_filename(&self) -> String {
        match &self.filename {
            Some(filename) if !filename.is_empty() => filename.clone(),
            _ => format!(
                "recording.{}",
                MediaContainer::resolve(&self.mime_type).0.extension()
            ),
        }
    }
}

/// Enumerated mapping from a declared MIME type to the artifact container.
/// Unknown types fall back to webm, flagged via the second tuple element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaContainer {
    Mp4,
    Webm,
}

impl MediaContainer {
    /// Returns the container plus whether the default fallback was applied.
    pub fn resolve(mime_type: &str) -> (Self, bool) {
        match mime_type {
            "video/mp4" | "audio/mp4" | "application/mp4" => (MediaContainer::Mp4, false),
            "video/webm" | "audio/webm" => (MediaContainer::Webm, false),
            _ => (MediaContainer::Webm, true),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaContainer::Mp4 => "mp4",
            MediaContainer::Webm => "webm",
        }
    }
}

/// Snapshot of an uploader's counters, uniform across providers with a typed
/// provider-specific detail section.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadStats {
    pub provider: StorageProvider,
    pub uploaded_bytes: u64,
    pub total_chunks: u64,
    pub is_uploading: bool,
    pub detail: StatsDetail,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StatsDetail {
    Local {
        buffered_chunks: usize,
    },
    Wasabi {
        current_part_number: u32,
        uploaded_parts: usize,
    },
    GoogleDrive {
        has_pending_chunk: bool,
        session_active: bool,
    },
}

//! Upload lifecycle events. The sink is injected at construction so the core
//! stays decoupled from whatever UI runtime consumes them.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

use crate::domain::value_objects::enums::providers::StorageProvider;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum UploadEvent {
    Progress {
        provider: StorageProvider,
        recording_id: Option<String>,
        filename: String,
        uploaded_bytes: u64,
        total_chunks: u64,
    },
    Success {
        provider: StorageProvider,
        recording_id: Option<String>,
        filename: String,
        size_bytes: u64,
        chunks: u64,
        provider_file_id: Option<String>,
    },
    Error {
        provider: StorageProvider,
        filename: String,
        error: String,
    },
}

impl UploadEvent {
    /// Wire-level event name, as consumed by the UI layer.
    pub fn name(&self) -> &'static str {
        match self {
            UploadEvent::Progress { .. } => "recording-upload-progress",
            UploadEvent::Success { .. } => "recording-upload-success",
            UploadEvent::Error { .. } => "recording-upload-error",
        }
    }
}

pub trait UploadEventSink: Send + Sync {
    fn emit(&self, event: UploadEvent);
}

/// Forwards events into a channel for an async consumer (UI bridge, tests).
pub struct ChannelEventSink {
    sender: UnboundedSender<UploadEvent>,
}

impl ChannelEventSink {
    pub fn new(sender: UnboundedSender<UploadEvent>) -> Self {
        Self { sender }
    }
}

impl UploadEventSink for ChannelEventSink {
    fn emit(&self, event: UploadEvent) {
        if self.sender.send(event).is_err() {
            warn!("upload event receiver dropped; event discarded");
        }
    }
}

/// Logs events instead of forwarding them; the default for headless use.
pub struct TracingEventSink;

impl UploadEventSink for TracingEventSink {
    fn emit(&self, event: UploadEvent) {
        match &event {
            UploadEvent::Progress {
                provider,
                filename,
                uploaded_bytes,
                total_chunks,
                ..
            } => info!(
                event = event.name(),
                provider = %provider,
                filename = %filename,
                uploaded_bytes,
                total_chunks,
                "recording upload progress"
            ),
            UploadEvent::Success {
                provider,
                filename,
                size_bytes,
                chunks,
                ..
            } => info!(
                event = event.name(),
                provider = %provider,
                filename = %filename,
                size_bytes,
                chunks,
                "recording upload completed"
            ),
            UploadEvent::Error {
                provider,
                filename,
                error: message,
            } => error!(
                event = event.name(),
                provider = %provider,
                filename = %filename,
                error = %message,
                "recording upload failed"
            ),
        }
    }
}

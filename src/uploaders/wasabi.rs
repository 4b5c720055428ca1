use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};

use crate::domain::repositories::collaborator::RecordingCollaborator;
use crate::domain::repositories::transport::SignedPartTransport;
use crate::domain::repositories::upload_session::UploadSession;
use crate::domain::value_objects::collaborator::{
    CompletedPart, MultipartAbortRequest, MultipartCompleteRequest, MultipartCreateRequest,
    ProgressUpdate, SignPartRequest, StartSessionRequest,
};
use crate::domain::value_objects::enums::providers::StorageProvider;
use crate::domain::value_objects::events::{UploadEvent, UploadEventSink};
use crate::domain::value_objects::recording::{RecordingMetadata, StatsDetail, UploadStats};
use crate::uploaders::error::UploadError;

const FIRST_PART_NUMBER: u32 = 1;

/// S3-style multipart upload to Wasabi. The collaborator creates the upload
/// and signs one URL per part; part bodies go straight to storage.
pub struct WasabiUploader {
    collaborator: Arc<dyn RecordingCollaborator + Send + Sync>,
    transport: Arc<dyn SignedPartTransport + Send + Sync>,
    events: Arc<dyn UploadEventSink>,
    metadata: Option<RecordingMetadata>,
    upload_id: Option<String>,
    key: Option<String>,
    recording_id: Option<String>,
    completed_parts: Vec<CompletedPart>,
    current_part_number: u32,
    uploaded_bytes: u64,
    total_chunks: u64,
    is_uploading: bool,
}

impl WasabiUploader {
    pub fn new(
        collaborator: Arc<dyn RecordingCollaborator + Send + Sync>,
        transport: Arc<dyn SignedPartTransport + Send + Sync>,
        events: Arc<dyn UploadEventSink>,
    ) -> Self {
        Self {
            collaborator,
            transport,
            events,
            metadata: None,
            upload_id: None,
            key: None,
            recording_id: None,
            completed_parts: Vec::new(),
            current_part_number: FIRST_PART_NUMBER,
            uploaded_bytes: 0,
            total_chunks: 0,
            is_uploading: false,
        }
    }

    fn resolved_filename(&self) -> String {
        self.metadata
            .as_ref()
            .map(RecordingMetadata::resolved_filename)
            .unwrap_or_else(|| "recording.webm".to_string())
    }

    async fn abort_remote(&self) {
        let (Some(upload_id), Some(key), Some(metadata)) =
            (&self.upload_id, &self.key, &self.metadata)
        else {
            return;
        };

        let request = MultipartAbortRequest {
            upload_id: upload_id.clone(),
            key: key.clone(),
            room_id: metadata.room_id.clone(),
        };
        if let Err(err) = self.collaborator.abort_multipart_upload(request).await {
            warn!(
                upload_id = %upload_id,
                error = %err,
                "failed to abort multipart upload remotely"
            );
        }
    }

    async fn report_part_progress(&self, part_number: u32, etag: &str, part_size_bytes: u64) {
        let (Some(recording_id), Some(metadata)) = (&self.recording_id, &self.metadata) else {
            return;
        };

        let update = ProgressUpdate::Part {
            part_number,
            etag: etag.to_string(),
            part_size_bytes,
            ended_at_ms: Utc::now().timestamp_millis(),
        };
        if let Err(err) = self
            .collaborator
            .update_progress(&metadata.room_id, recording_id, update)
            .await
        {
            warn!(
                recording_id = %recording_id,
                part_number,
                error = %err,
                "progress report failed; upload continues"
            );
        }
    }
}

#[async_trait]
impl UploadSession for WasabiUploader {
    fn provider(&self) -> StorageProvider {
        StorageProvider::Wasabi
    }

    async fn initialize(
        &mut self,
        metadata: RecordingMetadata,
        first_chunk: Bytes,
    ) -> Result<()> {
        self.reset();

        // The first captured chunk only sizes the create request; its bytes
        // are re-submitted later through upload_chunk.
        let create = MultipartCreateRequest {
            filename: metadata.resolved_filename(),
            content_type: metadata.mime_type.clone(),
            size: first_chunk.len() as u64,
            room_id: metadata.room_id.clone(),
            started_at_ms: metadata.started_at_ms(),
            ended_at_ms: None,
        };
        let created = self.collaborator.create_multipart_upload(create).await?;

        let registration = StartSessionRequest {
            filename: metadata.resolved_filename(),
            multipart_upload_id: Some(created.upload_id.clone()),
            provider_file_id: Some(created.key.clone()),
            started_at_ms: metadata.started_at_ms(),
            mime_type: metadata.mime_type.clone(),
        };
        let session = match self
            .collaborator
            .start_recording_session(&metadata.room_id, registration)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                // The multipart upload exists remotely but nothing tracks it;
                // abort it rather than leak the reservation.
                self.upload_id = Some(created.upload_id);
                self.key = Some(created.key);
                self.metadata = Some(metadata);
                self.abort_remote().await;
                self.reset();
                return Err(err);
            }
        };

        info!(
            room_id = %metadata.room_id,
            recording_id = %session.recording_id,
            upload_id = %created.upload_id,
            "wasabi multipart upload started"
        );

        self.upload_id = Some(created.upload_id);
        self.key = Some(created.key);
        self.recording_id = Some(session.recording_id);
        self.metadata = Some(metadata);
        self.is_uploading = true;
        Ok(())
    }

    async fn upload_chunk(&mut self, chunk: Bytes) -> Result<()> {
        if !self.is_uploading {
            anyhow::bail!("recording session is not active");
        }
        if chunk.is_empty() {
            return Ok(());
        }

        let upload_id = self
            .upload_id
            .clone()
            .context("active session missing upload id")?;
        let key = self.key.clone().context("active session missing key")?;
        let room_id = self
            .metadata
            .as_ref()
            .context("active session missing metadata")?
            .room_id
            .clone();
        let part_number = self.current_part_number;
        let part_size = chunk.len() as u64;

        let signed = self
            .collaborator
            .sign_part_upload(SignPartRequest {
                upload_id,
                key,
                part_number,
                room_id,
            })
            .await?;

        let outcome = self
            .transport
            .put_part(&signed.url, signed.headers, chunk)
            .await?;
        let etag = outcome.etag.ok_or_else(|| {
            UploadError::non_retryable(format!(
                "part {} upload returned no ETag; the bucket's CORS policy must expose it",
                part_number
            ))
        })?;

        self.completed_parts.push(CompletedPart {
            part_number,
            etag: etag.clone(),
        });
        self.current_part_number += 1;
        self.uploaded_bytes += part_size;
        self.total_chunks += 1;

        self.report_part_progress(part_number, &etag, part_size).await;

        self.events.emit(UploadEvent::Progress {
            provider: StorageProvider::Wasabi,
            recording_id: self.recording_id.clone(),
            filename: self.resolved_filename(),
            uploaded_bytes: self.uploaded_bytes,
            total_chunks: self.total_chunks,
        });

        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        if !self.is_uploading {
            return Ok(());
        }
        if self.completed_parts.is_empty() {
            // Completing with zero parts is invalid; drop the reservation.
            info!("no parts uploaded; aborting empty multipart upload");
            self.abort_remote().await;
            self.reset();
            return Ok(());
        }

        let metadata = self
            .metadata
            .clone()
            .context("active session missing metadata")?;
        let upload_id = self
            .upload_id
            .clone()
            .context("active session missing upload id")?;
        let key = self.key.clone().context("active session missing key")?;
        let filename = metadata.resolved_filename();
        let size_bytes = self.uploaded_bytes;
        let chunks = self.total_chunks;

        // S3 requires parts in ascending order regardless of upload order.
        let mut parts = self.completed_parts.clone();
        parts.sort_by_key(|part| part.part_number);

        let result = self
            .collaborator
            .complete_multipart_upload(MultipartCompleteRequest {
                upload_id,
                key: key.clone(),
                parts,
                room_id: metadata.room_id.clone(),
                filename: filename.clone(),
                size_bytes,
                started_at_ms: metadata.started_at_ms(),
                ended_at_ms: Utc::now().timestamp_millis(),
                mime: metadata.mime_type.clone(),
            })
            .await;

        match result {
            Ok(completed) => {
                info!(
                    recording_id = %completed.recording_id,
                    key = %key,
                    size_bytes,
                    chunks,
                    "wasabi multipart upload completed"
                );
                self.events.emit(UploadEvent::Success {
                    provider: StorageProvider::Wasabi,
                    recording_id: Some(completed.recording_id),
                    filename,
                    size_bytes,
                    chunks,
                    provider_file_id: Some(key),
                });
                self.reset();
                Ok(())
            }
            Err(err) => {
                self.events.emit(UploadEvent::Error {
                    provider: StorageProvider::Wasabi,
                    filename,
                    error: err.to_string(),
                });
                // The partial object is unusable; release its storage.
                self.abort_remote().await;
                self.reset();
                Err(err)
            }
        }
    }

    async fn abort(&mut self) -> Result<()> {
        self.abort_remote().await;
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.metadata = None;
        self.upload_id = None;
        self.key = None;
        self.recording_id = None;
        self.completed_parts.clear();
        self.current_part_number = FIRST_PART_NUMBER;
        self.uploaded_bytes = 0;
        self.total_chunks = 0;
        self.is_uploading = false;
    }

    fn stats(&self) -> UploadStats {
        UploadStats {
            provider: StorageProvider::Wasabi,
            uploaded_bytes: self.uploaded_bytes,
            total_chunks: self.total_chunks,
            is_uploading: self.is_uploading,
            detail: StatsDetail::Wasabi {
                current_part_number: self.current_part_number,
                uploaded_parts: self.completed_parts.len(),
            },
        }
    }
}

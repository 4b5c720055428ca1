use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::config_model::GoogleDriveConfig;
use crate::domain::repositories::collaborator::RecordingCollaborator;
use crate::domain::repositories::transport::{
    ByteRange, RangePutOutcome, ResumableTransport, SessionProbe,
};
use crate::domain::repositories::upload_session::UploadSession;
use crate::domain::value_objects::collaborator::{
    DriveConfirmMetadata, DriveConfirmRequest, DriveSessionMetadata, DriveSessionRequest,
    ProgressUpdate, StartSessionRequest,
};
use crate::domain::value_objects::enums::providers::StorageProvider;
use crate::domain::value_objects::events::{UploadEvent, UploadEventSink};
use crate::domain::value_objects::recording::{RecordingMetadata, StatsDetail, UploadStats};
use crate::uploaders::error::{UploadError, error_invalidated_session, error_is_retryable};

/// Google Drive resumable upload. Keeps exactly one chunk buffered so the
/// final chunk can declare the exact total size; everything before it goes up
/// with an open-ended `bytes {s}-{e}/*` range.
pub struct GoogleDriveUploader {
    collaborator: Arc<dyn RecordingCollaborator + Send + Sync>,
    transport: Arc<dyn ResumableTransport + Send + Sync>,
    events: Arc<dyn UploadEventSink>,
    config: GoogleDriveConfig,
    metadata: Option<RecordingMetadata>,
    session_uri: Option<String>,
    access_token: Option<String>,
    recording_id: Option<String>,
    pending_chunk: Option<Bytes>,
    uploaded_bytes: u64,
    total_chunks: u64,
    is_uploading: bool,
}

impl GoogleDriveUploader {
    pub fn new(
        collaborator: Arc<dyn RecordingCollaborator + Send + Sync>,
        transport: Arc<dyn ResumableTransport + Send + Sync>,
        events: Arc<dyn UploadEventSink>,
        config: GoogleDriveConfig,
    ) -> Self {
        Self {
            collaborator,
            transport,
            events,
            config,
            metadata: None,
            session_uri: None,
            access_token: None,
            recording_id: None,
            pending_chunk: None,
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

    fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.config.chunk_timeout_secs)
    }

    /// Asks the session URI whether it still accepts ranges, without
    /// transferring data.
    pub async fn probe(&self) -> Result<SessionProbe> {
        let (Some(session_uri), Some(access_token)) = (&self.session_uri, &self.access_token)
        else {
            anyhow::bail!("recording session is not active");
        };
        self.transport
            .probe_session(
                session_uri,
                access_token,
                self.config.declared_session_size_bytes,
                Duration::from_secs(self.config.session_probe_timeout_secs),
            )
            .await
    }

    async fn open_session(&mut self, metadata: RecordingMetadata) -> Result<()> {
        let session = self
            .collaborator
            .create_drive_session(
                &metadata.room_id,
                DriveSessionRequest {
                    filename: metadata.resolved_filename(),
                    content_type: metadata.mime_type.clone(),
                    // Declared size only has to exceed the recording; the
                    // final chunk states the exact total.
                    size: self.config.declared_session_size_bytes,
                    metadata: DriveSessionMetadata {
                        started_at_ms: metadata.started_at_ms(),
                        ended_at_ms: None,
                    },
                },
            )
            .await?;

        let registration = self
            .collaborator
            .start_recording_session(
                &metadata.room_id,
                StartSessionRequest {
                    filename: metadata.resolved_filename(),
                    multipart_upload_id: None,
                    provider_file_id: Some(session.session_uri.clone()),
                    started_at_ms: metadata.started_at_ms(),
                    mime_type: metadata.mime_type.clone(),
                },
            )
            .await?;

        info!(
            room_id = %metadata.room_id,
            recording_id = %registration.recording_id,
            "google drive resumable session started"
        );

        self.session_uri = Some(session.session_uri);
        self.access_token = Some(session.access_token);
        self.recording_id = Some(registration.recording_id);
        self.metadata = Some(metadata);
        self.uploaded_bytes = 0;
        self.total_chunks = 0;
        self.is_uploading = true;
        Ok(())
    }

    /// Explicit recovery after the session went away (404/410). Opens a fresh
    /// session with the recorded metadata and buffers `next_chunk` as its
    /// first pending chunk. Bytes accepted by the dead session are
    /// unrecoverable on the client; the new session starts from zero, and
    /// whether that partial loss is acceptable is the caller's call.
    pub async fn recreate_session(&mut self, next_chunk: Bytes) -> Result<()> {
        let metadata = self
            .metadata
            .clone()
            .ok_or_else(|| UploadError::non_retryable("no metadata to recreate session from"))?;

        warn!(
            room_id = %metadata.room_id,
            lost_bytes = self.uploaded_bytes,
            "resumable session gone; recreating"
        );

        self.session_uri = None;
        self.access_token = None;
        self.recording_id = None;
        self.pending_chunk = None;
        self.open_session(metadata).await?;
        if !next_chunk.is_empty() {
            self.pending_chunk = Some(next_chunk);
        }
        Ok(())
    }

    /// PUTs one range with bounded retries. Transient failures back off
    /// exponentially; a dead session (404/410) deactivates the session URI
    /// and propagates, leaving recovery to an explicit `recreate_session`.
    async fn put_chunk(&mut self, chunk: Bytes, is_final: bool) -> Result<RangePutOutcome> {
        let chunk_len = chunk.len() as u64;
        let range = ByteRange {
            start: self.uploaded_bytes,
            end: self.uploaded_bytes + chunk_len - 1,
            total: is_final.then_some(self.uploaded_bytes + chunk_len),
        };

        let mut retry_count: u32 = 0;
        loop {
            let session_uri = self
                .session_uri
                .clone()
                .ok_or_else(|| UploadError::non_retryable("no active resumable session"))?;
            let access_token = self
                .access_token
                .clone()
                .ok_or_else(|| UploadError::non_retryable("no active resumable session"))?;

            match self
                .transport
                .put_range(
                    &session_uri,
                    &access_token,
                    range,
                    chunk.clone(),
                    self.chunk_timeout(),
                )
                .await
            {
                Ok(RangePutOutcome::Completed { .. }) if !is_final => {
                    // The remote file closed before the declared end of the
                    // recording; whatever caused it, no further range will be
                    // accepted.
                    self.session_uri = None;
                    self.access_token = None;
                    return Err(UploadError::non_retryable(
                        "resumable session reported completion before the final chunk",
                    ));
                }
                Ok(outcome) => {
                    self.uploaded_bytes += chunk_len;
                    self.total_chunks += 1;
                    self.report_chunk_progress(chunk_len).await;
                    self.events.emit(UploadEvent::Progress {
                        provider: StorageProvider::GoogleDrive,
                        recording_id: self.recording_id.clone(),
                        filename: self.resolved_filename(),
                        uploaded_bytes: self.uploaded_bytes,
                        total_chunks: self.total_chunks,
                    });
                    return Ok(outcome);
                }
                Err(err) if error_invalidated_session(&err) => {
                    self.session_uri = None;
                    self.access_token = None;
                    return Err(err);
                }
                Err(err) => {
                    retry_count += 1;
                    if !error_is_retryable(&err) || retry_count > self.config.max_retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(
                        self.config.backoff_base_secs.saturating_pow(retry_count),
                    );
                    warn!(
                        retry_count,
                        backoff_secs = backoff.as_secs(),
                        error = %err,
                        "resumable chunk failed; backing off"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn report_chunk_progress(&self, chunk_size_bytes: u64) {
        let (Some(recording_id), Some(metadata)) = (&self.recording_id, &self.metadata) else {
            return;
        };

        let update = ProgressUpdate::Chunk {
            chunk_size_bytes,
            ended_at_ms: Utc::now().timestamp_millis(),
        };
        if let Err(err) = self
            .collaborator
            .update_progress(&metadata.room_id, recording_id, update)
            .await
        {
            warn!(
                recording_id = %recording_id,
                error = %err,
                "progress report failed; upload continues"
            );
        }
    }

    async fn finalize_inner(&mut self, final_chunk: Bytes) -> Result<()> {
        let metadata = self
            .metadata
            .clone()
            .context("active session missing metadata")?;
        let outcome = self.put_chunk(final_chunk, true).await?;
        // put_chunk already counted the final chunk, so this is the exact
        // size the session was closed with.
        let total = self.uploaded_bytes;
        let file_id = match outcome {
            RangePutOutcome::Completed { file_id } => file_id.ok_or_else(|| {
                UploadError::non_retryable("resumable session completed without a file id")
            })?,
            RangePutOutcome::Incomplete => {
                return Err(UploadError::non_retryable(
                    "resumable session still incomplete after the final chunk",
                ));
            }
        };

        let session_uri = self
            .session_uri
            .clone()
            .context("active session missing session uri")?;
        let confirmed = self
            .collaborator
            .confirm_drive_upload(
                &metadata.room_id,
                DriveConfirmRequest {
                    session_uri,
                    file_id,
                    metadata: DriveConfirmMetadata {
                        filename: metadata.resolved_filename(),
                        size_bytes: total,
                    },
                },
            )
            .await?;

        info!(
            recording_id = %confirmed.recording_id,
            provider_file_id = %confirmed.provider_file_id,
            size_bytes = total,
            "google drive upload completed"
        );
        self.events.emit(UploadEvent::Success {
            provider: StorageProvider::GoogleDrive,
            recording_id: Some(confirmed.recording_id),
            filename: metadata.resolved_filename(),
            size_bytes: total,
            chunks: self.total_chunks,
            provider_file_id: Some(confirmed.provider_file_id),
        });
        Ok(())
    }
}

#[async_trait]
impl UploadSession for GoogleDriveUploader {
    fn provider(&self) -> StorageProvider {
        StorageProvider::GoogleDrive
    }

    async fn initialize(
        &mut self,
        metadata: RecordingMetadata,
        _first_chunk: Bytes,
    ) -> Result<()> {
        self.reset();
        self.open_session(metadata).await
    }

    async fn upload_chunk(&mut self, chunk: Bytes) -> Result<()> {
        if !self.is_uploading {
            anyhow::bail!("recording session is not active");
        }
        if chunk.is_empty() {
            return Ok(());
        }

        // One-chunk lookahead: transmit the previously buffered chunk with an
        // open-ended range and keep this one back. Whichever chunk turns out
        // to be last is therefore still on hand at finalize.
        match self.pending_chunk.take() {
            Some(previous) => {
                self.put_chunk(previous, false).await?;
                self.pending_chunk = Some(chunk);
            }
            None => {
                self.pending_chunk = Some(chunk);
            }
        }
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        if !self.is_uploading {
            return Ok(());
        }

        let Some(final_chunk) = self.pending_chunk.take() else {
            // Nothing was ever recorded; there is no remote file to close.
            self.reset();
            return Ok(());
        };

        let result = self.finalize_inner(final_chunk).await;
        if let Err(err) = &result {
            self.events.emit(UploadEvent::Error {
                provider: StorageProvider::GoogleDrive,
                filename: self.resolved_filename(),
                error: err.to_string(),
            });
        }
        self.reset();
        result
    }

    async fn abort(&mut self) -> Result<()> {
        // Drive offers no client-side session delete; unclosed sessions
        // expire on their own.
        if let Some(recording_id) = &self.recording_id {
            info!(recording_id = %recording_id, "google drive upload aborted");
        }
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.metadata = None;
        self.session_uri = None;
        self.access_token = None;
        self.recording_id = None;
        self.pending_chunk = None;
        self.uploaded_bytes = 0;
        self.total_chunks = 0;
        self.is_uploading = false;
    }

    fn stats(&self) -> UploadStats {
        UploadStats {
            provider: StorageProvider::GoogleDrive,
            uploaded_bytes: self.uploaded_bytes,
            total_chunks: self.total_chunks,
            is_uploading: self.is_uploading,
            detail: StatsDetail::GoogleDrive {
                has_pending_chunk: self.pending_chunk.is_some(),
                session_active: self.session_uri.is_some(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::collaborator::MockRecordingCollaborator;
    use crate::domain::repositories::transport::MockResumableTransport;
    use crate::domain::value_objects::collaborator::{
        DriveConfirmed, DriveSession, StartSessionResponse,
    };
    use crate::domain::value_objects::events::ChannelEventSink;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn test_metadata() -> RecordingMetadata {
        RecordingMetadata {
            room_id: "room-3".into(),
            filename: Some("session.webm".into()),
            mime_type: "video/webm".into(),
            started_at: Utc::now(),
        }
    }

    fn fast_config() -> GoogleDriveConfig {
        GoogleDriveConfig::default()
    }

    fn event_channel() -> (Arc<ChannelEventSink>, UnboundedReceiver<UploadEvent>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Arc::new(ChannelEventSink::new(sender)), receiver)
    }

    fn collaborator_with_session() -> MockRecordingCollaborator {
        let mut collaborator = MockRecordingCollaborator::new();
        collaborator
            .expect_create_drive_session()
            .returning(|_, _| {
                Ok(DriveSession {
                    session_uri: "https://drive.example/session/1".into(),
                    access_token: "token-1".into(),
                })
            });
        collaborator
            .expect_start_recording_session()
            .returning(|_, _| {
                Ok(StartSessionResponse {
                    recording_id: "rec-1".into(),
                })
            });
        collaborator
            .expect_update_progress()
            .returning(|_, _, _| Ok(()));
        collaborator
    }

    fn range_capturing_transport(
        captured: Arc<Mutex<Vec<ByteRange>>>,
        complete_with_id: &'static str,
    ) -> MockResumableTransport {
        let mut transport = MockResumableTransport::new();
        transport
            .expect_put_range()
            .returning(move |_, _, range, _, _| {
                captured.lock().unwrap().push(range);
                if range.total.is_some() {
                    Ok(RangePutOutcome::Completed {
                        file_id: Some(complete_with_id.to_string()),
                    })
                } else {
                    Ok(RangePutOutcome::Incomplete)
                }
            });
        transport
    }

    #[tokio::test]
    async fn keeps_one_chunk_back_and_closes_with_exact_total() {
        let mut collaborator = collaborator_with_session();
        collaborator
            .expect_confirm_drive_upload()
            .times(1)
            .withf(|_, request| {
                request.file_id == "file-1" && request.metadata.size_bytes == 300
            })
            .returning(|_, _| {
                Ok(DriveConfirmed {
                    recording_id: "rec-1".into(),
                    provider_file_id: "file-1".into(),
                    web_view_link: None,
                })
            });

        let ranges = Arc::new(Mutex::new(Vec::new()));
        let transport = range_capturing_transport(ranges.clone(), "file-1");
        let (events, _receiver) = event_channel();
        let mut uploader = GoogleDriveUploader::new(
            Arc::new(collaborator),
            Arc::new(transport),
            events,
            fast_config(),
        );

        uploader
            .initialize(test_metadata(), Bytes::from(vec![0u8; 50]))
            .await
            .unwrap();
        for byte in [1u8, 2, 3] {
            uploader
                .upload_chunk(Bytes::from(vec![byte; 100]))
                .await
                .unwrap();
        }

        // Only the two non-final chunks have gone up; the third waits.
        {
            let seen = ranges.lock().unwrap();
            assert_eq!(seen.len(), 2);
            assert_eq!(seen[0].header_value(), "bytes 0-99/*");
            assert_eq!(seen[1].header_value(), "bytes 100-199/*");
        }
        let stats = uploader.stats();
        assert_eq!(stats.uploaded_bytes, 200);
        assert!(matches!(
            stats.detail,
            StatsDetail::GoogleDrive {
                has_pending_chunk: true,
                session_active: true
            }
        ));

        uploader.finalize().await.unwrap();

        let seen = ranges.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].header_value(), "bytes 200-299/300");
    }

    #[tokio::test]
    async fn uploaded_bytes_exclude_the_pending_chunk() {
        let collaborator = collaborator_with_session();
        let ranges = Arc::new(Mutex::new(Vec::new()));
        let transport = range_capturing_transport(ranges, "file-1");
        let (events, _receiver) = event_channel();
        let mut uploader = GoogleDriveUploader::new(
            Arc::new(collaborator),
            Arc::new(transport),
            events,
            fast_config(),
        );

        uploader
            .initialize(test_metadata(), Bytes::new())
            .await
            .unwrap();
        uploader
            .upload_chunk(Bytes::from(vec![1u8; 100]))
            .await
            .unwrap();
        assert_eq!(uploader.stats().uploaded_bytes, 0);

        uploader
            .upload_chunk(Bytes::from(vec![2u8; 100]))
            .await
            .unwrap();
        assert_eq!(uploader.stats().uploaded_bytes, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_back_off_exponentially() {
        let collaborator = collaborator_with_session();

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let mut transport = MockResumableTransport::new();
        transport
            .expect_put_range()
            .returning(move |_, _, _, _, _| {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(UploadError::retryable("connection reset"))
                } else {
                    Ok(RangePutOutcome::Incomplete)
                }
            });

        let (events, _receiver) = event_channel();
        let mut uploader = GoogleDriveUploader::new(
            Arc::new(collaborator),
            Arc::new(transport),
            events,
            fast_config(),
        );

        uploader
            .initialize(test_metadata(), Bytes::new())
            .await
            .unwrap();
        uploader
            .upload_chunk(Bytes::from(vec![1u8; 10]))
            .await
            .unwrap();

        let started = tokio::time::Instant::now();
        uploader
            .upload_chunk(Bytes::from(vec![2u8; 10]))
            .await
            .unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Two retries: 2s then 4s of backoff, auto-advanced by paused time.
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_the_retry_budget() {
        let collaborator = collaborator_with_session();

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let mut transport = MockResumableTransport::new();
        transport
            .expect_put_range()
            .returning(move |_, _, _, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(UploadError::retryable("connection reset"))
            });

        let (events, _receiver) = event_channel();
        let mut uploader = GoogleDriveUploader::new(
            Arc::new(collaborator),
            Arc::new(transport),
            events,
            fast_config(),
        );

        uploader
            .initialize(test_metadata(), Bytes::new())
            .await
            .unwrap();
        uploader
            .upload_chunk(Bytes::from(vec![1u8; 10]))
            .await
            .unwrap();
        assert!(uploader
            .upload_chunk(Bytes::from(vec![2u8; 10]))
            .await
            .is_err());

        // Initial attempt plus max_retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn non_retryable_failures_are_not_retried() {
        let collaborator = collaborator_with_session();

        let mut transport = MockResumableTransport::new();
        transport
            .expect_put_range()
            .times(1)
            .returning(|_, _, _, _, _| Err(UploadError::non_retryable("bad request")));

        let (events, _receiver) = event_channel();
        let mut uploader = GoogleDriveUploader::new(
            Arc::new(collaborator),
            Arc::new(transport),
            events,
            fast_config(),
        );

        uploader
            .initialize(test_metadata(), Bytes::new())
            .await
            .unwrap();
        uploader
            .upload_chunk(Bytes::from(vec![1u8; 10]))
            .await
            .unwrap();
        assert!(uploader
            .upload_chunk(Bytes::from(vec![2u8; 10]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn premature_completion_on_a_non_final_chunk_is_an_error() {
        let mut collaborator = collaborator_with_session();
        collaborator.expect_confirm_drive_upload().never();

        let mut transport = MockResumableTransport::new();
        transport
            .expect_put_range()
            .times(1)
            .returning(|_, _, _, _, _| {
                Ok(RangePutOutcome::Completed {
                    file_id: Some("file-1".to_string()),
                })
            });

        let (events, _receiver) = event_channel();
        let mut uploader = GoogleDriveUploader::new(
            Arc::new(collaborator),
            Arc::new(transport),
            events,
            fast_config(),
        );

        uploader
            .initialize(test_metadata(), Bytes::new())
            .await
            .unwrap();
        uploader
            .upload_chunk(Bytes::from(vec![1u8; 100]))
            .await
            .unwrap();
        let err = uploader
            .upload_chunk(Bytes::from(vec![2u8; 100]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("before the final chunk"));

        let stats = uploader.stats();
        assert_eq!(stats.uploaded_bytes, 0);
        assert!(matches!(
            stats.detail,
            StatsDetail::GoogleDrive {
                session_active: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn dead_session_surfaces_an_error_instead_of_truncating() {
        let mut collaborator = collaborator_with_session();
        collaborator.expect_confirm_drive_upload().never();

        // The session accepts the first chunk, then goes away.
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let mut transport = MockResumableTransport::new();
        transport
            .expect_put_range()
            .times(2)
            .returning(move |_, _, _, _, _| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(RangePutOutcome::Incomplete)
                } else {
                    Err(UploadError::session_invalidated("session gone"))
                }
            });

        let (events, mut receiver) = event_channel();
        let mut uploader = GoogleDriveUploader::new(
            Arc::new(collaborator),
            Arc::new(transport),
            events,
            fast_config(),
        );

        uploader
            .initialize(test_metadata(), Bytes::new())
            .await
            .unwrap();
        uploader
            .upload_chunk(Bytes::from(vec![1u8; 100]))
            .await
            .unwrap();
        uploader
            .upload_chunk(Bytes::from(vec![2u8; 100]))
            .await
            .unwrap();

        // Third chunk flushes the second into the dead session: the caller
        // must see the failure, not a quietly shortened recording.
        let err = uploader
            .upload_chunk(Bytes::from(vec![3u8; 100]))
            .await
            .unwrap_err();
        assert!(error_invalidated_session(&err));

        let stats = uploader.stats();
        assert_eq!(stats.uploaded_bytes, 100);
        assert!(matches!(
            stats.detail,
            StatsDetail::GoogleDrive {
                session_active: false,
                ..
            }
        ));
        while let Ok(event) = receiver.try_recv() {
            assert_ne!(event.name(), "recording-upload-success");
        }
    }

    #[tokio::test]
    async fn explicit_recreation_opens_a_fresh_session_from_zero() {
        let mut collaborator = MockRecordingCollaborator::new();
        let sessions = Arc::new(AtomicU32::new(0));
        let session_counter = sessions.clone();
        collaborator
            .expect_create_drive_session()
            .times(2)
            .returning(move |_, _| {
                let n = session_counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(DriveSession {
                    session_uri: format!("https://drive.example/session/{}", n),
                    access_token: format!("token-{}", n),
                })
            });
        collaborator
            .expect_start_recording_session()
            .times(2)
            .returning(|_, _| {
                Ok(StartSessionResponse {
                    recording_id: "rec-1".into(),
                })
            });
        collaborator
            .expect_update_progress()
            .returning(|_, _, _| Ok(()));
        // Confirmation must cover only the bytes the live session accepted.
        collaborator
            .expect_confirm_drive_upload()
            .times(1)
            .withf(|_, request| request.metadata.size_bytes == 100)
            .returning(|_, _| {
                Ok(DriveConfirmed {
                    recording_id: "rec-1".into(),
                    provider_file_id: "file-2".into(),
                    web_view_link: None,
                })
            });

        let puts = Arc::new(Mutex::new(Vec::new()));
        let captured = puts.clone();
        let mut transport = MockResumableTransport::new();
        transport
            .expect_put_range()
            .times(2)
            .returning(move |session_uri, _, range, _, _| {
                captured
                    .lock()
                    .unwrap()
                    .push((session_uri.to_string(), range));
                if session_uri.ends_with("/1") {
                    Err(UploadError::session_invalidated("session gone"))
                } else {
                    Ok(RangePutOutcome::Completed {
                        file_id: Some("file-2".to_string()),
                    })
                }
            });

        let (events, _receiver) = event_channel();
        let mut uploader = GoogleDriveUploader::new(
            Arc::new(collaborator),
            Arc::new(transport),
            events,
            fast_config(),
        );

        uploader
            .initialize(test_metadata(), Bytes::new())
            .await
            .unwrap();
        uploader
            .upload_chunk(Bytes::from(vec![1u8; 100]))
            .await
            .unwrap();
        let err = uploader
            .upload_chunk(Bytes::from(vec![2u8; 100]))
            .await
            .unwrap_err();
        assert!(error_invalidated_session(&err));

        // The caller chooses to recover: fresh session, the replacement
        // chunk buffered, counters back at zero.
        uploader
            .recreate_session(Bytes::from(vec![3u8; 100]))
            .await
            .unwrap();
        let stats = uploader.stats();
        assert_eq!(stats.uploaded_bytes, 0);
        assert!(matches!(
            stats.detail,
            StatsDetail::GoogleDrive {
                has_pending_chunk: true,
                session_active: true
            }
        ));

        uploader.finalize().await.unwrap();

        let puts = puts.lock().unwrap();
        assert_eq!(puts[0].0, "https://drive.example/session/1");
        assert_eq!(puts[1].0, "https://drive.example/session/2");
        assert_eq!(puts[1].1.header_value(), "bytes 0-99/100");
        assert_eq!(sessions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn registration_carries_the_session_uri() {
        let mut collaborator = MockRecordingCollaborator::new();
        collaborator
            .expect_create_drive_session()
            .returning(|_, _| {
                Ok(DriveSession {
                    session_uri: "https://drive.example/session/abc".into(),
                    access_token: "token".into(),
                })
            });
        collaborator
            .expect_start_recording_session()
            .times(1)
            .withf(|room_id, request| {
                room_id == "room-3"
                    && request.multipart_upload_id.is_none()
                    && request.provider_file_id.as_deref()
                        == Some("https://drive.example/session/abc")
            })
            .returning(|_, _| {
                Ok(StartSessionResponse {
                    recording_id: "rec-1".into(),
                })
            });

        let transport = MockResumableTransport::new();
        let (events, _receiver) = event_channel();
        let mut uploader = GoogleDriveUploader::new(
            Arc::new(collaborator),
            Arc::new(transport),
            events,
            fast_config(),
        );

        uploader
            .initialize(test_metadata(), Bytes::new())
            .await
            .unwrap();
        assert!(uploader.stats().is_uploading);
    }

    #[tokio::test]
    async fn failed_confirmation_resets_and_reports() {
        let mut collaborator = collaborator_with_session();
        collaborator
            .expect_confirm_drive_upload()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("confirmation rejected")));

        let ranges = Arc::new(Mutex::new(Vec::new()));
        let transport = range_capturing_transport(ranges, "file-1");
        let (events, mut receiver) = event_channel();
        let mut uploader = GoogleDriveUploader::new(
            Arc::new(collaborator),
            Arc::new(transport),
            events,
            fast_config(),
        );

        uploader
            .initialize(test_metadata(), Bytes::new())
            .await
            .unwrap();
        uploader
            .upload_chunk(Bytes::from(vec![1u8; 10]))
            .await
            .unwrap();
        assert!(uploader.finalize().await.is_err());

        assert!(!uploader.stats().is_uploading);
        let mut saw_error = false;
        while let Ok(event) = receiver.try_recv() {
            if event.name() == "recording-upload-error" {
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn empty_chunks_are_skipped() {
        let collaborator = collaborator_with_session();
        let transport = MockResumableTransport::new();
        let (events, _receiver) = event_channel();
        let mut uploader = GoogleDriveUploader::new(
            Arc::new(collaborator),
            Arc::new(transport),
            events,
            fast_config(),
        );

        uploader
            .initialize(test_metadata(), Bytes::new())
            .await
            .unwrap();
        uploader.upload_chunk(Bytes::new()).await.unwrap();
        assert!(matches!(
            uploader.stats().detail,
            StatsDetail::GoogleDrive {
                has_pending_chunk: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn finalize_with_nothing_recorded_is_a_noop() {
        let collaborator = collaborator_with_session();
        let transport = MockResumableTransport::new();
        let (events, mut receiver) = event_channel();
        let mut uploader = GoogleDriveUploader::new(
            Arc::new(collaborator),
            Arc::new(transport),
            events,
            fast_config(),
        );

        uploader
            .initialize(test_metadata(), Bytes::new())
            .await
            .unwrap();
        uploader.finalize().await.unwrap();
        assert!(!uploader.stats().is_uploading);
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn rejects_chunks_outside_active_session() {
        let collaborator = MockRecordingCollaborator::new();
        let transport = MockResumableTransport::new();
        let (events, _receiver) = event_channel();
        let mut uploader = GoogleDriveUploader::new(
            Arc::new(collaborator),
            Arc::new(transport),
            events,
            fast_config(),
        );

        let err = uploader
            .upload_chunk(Bytes::from_static(b"abc"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not active"));
    }
}

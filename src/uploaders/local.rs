use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tracing::info;

use crate::config::config_model::LocalDownloadConfig;
use crate::domain::repositories::upload_session::UploadSession;
use crate::domain::value_objects::enums::providers::StorageProvider;
use crate::domain::value_objects::events::{UploadEvent, UploadEventSink};
use crate::domain::value_objects::recording::{
    MediaContainer, RecordingMetadata, StatsDetail, UploadStats,
};

/// Keeps every chunk in memory and writes one combined artifact into the
/// configured directory at finalize. Nothing leaves the machine.
pub struct LocalUploader {
    output_dir: PathBuf,
    events: Arc<dyn UploadEventSink>,
    metadata: Option<RecordingMetadata>,
    recorded_chunks: Vec<Bytes>,
    uploaded_bytes: u64,
    total_chunks: u64,
    is_uploading: bool,
}

impl LocalUploader {
    pub fn new(config: &LocalDownloadConfig, events: Arc<dyn UploadEventSink>) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            events,
            metadata: None,
            recorded_chunks: Vec::new(),
            uploaded_bytes: 0,
            total_chunks: 0,
            is_uploading: false,
        }
    }

    /// Writes a timestamped partial artifact from whatever has been recorded
    /// so far, without disturbing the in-progress session.
    pub async fn download_current_recording(&self) -> Result<PathBuf> {
        if self.recorded_chunks.is_empty() {
            anyhow::bail!("no recorded data to download");
        }
        let metadata = self
            .metadata
            .as_ref()
            .context("recording session is not active")?;

        let resolved = metadata.resolved_filename();
        let stem = Path::new(&resolved)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("recording");
        let extension = MediaContainer::resolve(&metadata.mime_type).0.extension();
        let filename = format!(
            "{}-partial-{}.{}",
            stem,
            Utc::now().format("%Y%m%d%H%M%S"),
            extension
        );

        let path = self.write_artifact(&filename).await?;
        info!(
            path = %path.display(),
            size_bytes = self.uploaded_bytes,
            chunks = self.total_chunks,
            "partial local recording written"
        );
        Ok(path)
    }

    async fn write_artifact(&self, filename: &str) -> Result<PathBuf> {
        let mut data = Vec::with_capacity(self.uploaded_bytes as usize);
        for chunk in &self.recorded_chunks {
            data.extend_from_slice(chunk);
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| {
                format!(
                    "failed to create output directory {}",
                    self.output_dir.display()
                )
            })?;

        let path = self.output_dir.join(filename);
        tokio::fs::write(&path, &data)
            .await
            .with_context(|| format!("failed to write recording to {}", path.display()))?;

        Ok(path)
    }

    fn resolved_filename(&self) -> String {
        self.metadata
            .as_ref()
            .map(RecordingMetadata::resolved_filename)
            .unwrap_or_else(|| "recording.webm".to_string())
    }
}

#[async_trait]
impl UploadSession for LocalUploader {
    fn provider(&self) -> StorageProvider {
        StorageProvider::Local
    }

    async fn initialize(
        &mut self,
        metadata: RecordingMetadata,
        _first_chunk: Bytes,
    ) -> Result<()> {
        self.reset();
        info!(
            room_id = %metadata.room_id,
            filename = %metadata.resolved_filename(),
            "local recording started"
        );
        self.metadata = Some(metadata);
        self.is_uploading = true;
        Ok(())
    }

    async fn upload_chunk(&mut self, chunk: Bytes) -> Result<()> {
        if !self.is_uploading {
            anyhow::bail!("recording session is not active");
        }

        self.uploaded_bytes += chunk.len() as u64;
        self.total_chunks += 1;
        self.recorded_chunks.push(chunk);

        self.events.emit(UploadEvent::Progress {
            provider: StorageProvider::Local,
            recording_id: None,
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

        let filename = self.resolved_filename();
        let size_bytes = self.uploaded_bytes;
        let chunks = self.total_chunks;

        let result = self.write_artifact(&filename).await;
        // Reset before reporting so a failed write can't leave the session
        // stuck uploading.
        self.reset();

        match result {
            Ok(path) => {
                info!(
                    path = %path.display(),
                    size_bytes,
                    chunks,
                    "local recording saved"
                );
                self.events.emit(UploadEvent::Success {
                    provider: StorageProvider::Local,
                    recording_id: None,
                    filename,
                    size_bytes,
                    chunks,
                    provider_file_id: Some(path.display().to_string()),
                });
                Ok(())
            }
            Err(err) => {
                self.events.emit(UploadEvent::Error {
                    provider: StorageProvider::Local,
                    filename,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn abort(&mut self) -> Result<()> {
        // Nothing was sent anywhere; dropping the buffer is the cleanup.
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.metadata = None;
        self.recorded_chunks.clear();
        self.uploaded_bytes = 0;
        self.total_chunks = 0;
        self.is_uploading = false;
    }

    fn stats(&self) -> UploadStats {
        UploadStats {
            provider: StorageProvider::Local,
            uploaded_bytes: self.uploaded_bytes,
            total_chunks: self.total_chunks,
            is_uploading: self.is_uploading,
            detail: StatsDetail::Local {
                buffered_chunks: self.recorded_chunks.len(),
            },
        }
    }
}

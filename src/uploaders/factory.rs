use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::config_model::UploaderConfig;
use crate::domain::repositories::collaborator::RecordingCollaborator;
use crate::domain::repositories::transport::{ResumableTransport, SignedPartTransport};
use crate::domain::repositories::upload_session::UploadSession;
use crate::domain::value_objects::enums::providers::StorageProvider;
use crate::domain::value_objects::events::{TracingEventSink, UploadEventSink};
use crate::infra::http::{HttpProviderTransport, RecordingApiHttp};
use crate::uploaders::google_drive::GoogleDriveUploader;
use crate::uploaders::local::LocalUploader;
use crate::uploaders::wasabi::WasabiUploader;

/// Static, provider-level facts a UI can branch on before any session exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub supports_multipart: bool,
    pub requires_auth: bool,
    pub recommended_chunk_interval: Duration,
}

/// Builds uploaders for a chosen provider with shared infrastructure
/// injected once at construction.
pub struct UploaderFactory {
    collaborator: Arc<dyn RecordingCollaborator + Send + Sync>,
    signed_part_transport: Arc<dyn SignedPartTransport + Send + Sync>,
    resumable_transport: Arc<dyn ResumableTransport + Send + Sync>,
    events: Arc<dyn UploadEventSink>,
    config: UploaderConfig,
}

impl UploaderFactory {
    pub fn new(
        collaborator: Arc<dyn RecordingCollaborator + Send + Sync>,
        signed_part_transport: Arc<dyn SignedPartTransport + Send + Sync>,
        resumable_transport: Arc<dyn ResumableTransport + Send + Sync>,
        events: Arc<dyn UploadEventSink>,
        config: UploaderConfig,
    ) -> Self {
        Self {
            collaborator,
            signed_part_transport,
            resumable_transport,
            events,
            config,
        }
    }

    /// Wires the reqwest-backed collaborator and transports from config, with
    /// events going to the log.
    pub fn from_config(config: UploaderConfig) -> Result<Self> {
        let collaborator = Arc::new(RecordingApiHttp::new(&config.api)?);
        let transport = Arc::new(HttpProviderTransport::new()?);
        Ok(Self::new(
            collaborator,
            transport.clone(),
            transport,
            Arc::new(TracingEventSink),
            config,
        ))
    }

    pub fn create(&self, provider: StorageProvider) -> Box<dyn UploadSession> {
        match provider {
            StorageProvider::Local => Box::new(LocalUploader::new(
                &self.config.local,
                self.events.clone(),
            )),
            StorageProvider::Wasabi => Box::new(WasabiUploader::new(
                self.collaborator.clone(),
                self.signed_part_transport.clone(),
                self.events.clone(),
            )),
            StorageProvider::GoogleDrive => Box::new(GoogleDriveUploader::new(
                self.collaborator.clone(),
                self.resumable_transport.clone(),
                self.events.clone(),
                self.config.google_drive.clone(),
            )),
        }
    }

    /// Parses the provider name first, so unsupported values fail before any
    /// session work begins.
    pub fn create_for(&self, provider_name: &str) -> Result<Box<dyn UploadSession>> {
        let provider: StorageProvider = provider_name
            .parse()
            .map_err(|err: String| anyhow::anyhow!(err))?;
        Ok(self.create(provider))
    }

    pub fn capabilities(provider: StorageProvider) -> ProviderCapabilities {
        match provider {
            StorageProvider::Local => ProviderCapabilities {
                supports_multipart: false,
                requires_auth: false,
                recommended_chunk_interval: Duration::from_secs(1),
            },
            StorageProvider::Wasabi => ProviderCapabilities {
                supports_multipart: true,
                requires_auth: false,
                recommended_chunk_interval: Duration::from_secs(5),
            },
            StorageProvider::GoogleDrive => ProviderCapabilities {
                supports_multipart: false,
                requires_auth: true,
                recommended_chunk_interval: Duration::from_secs(5),
            },
        }
    }
}

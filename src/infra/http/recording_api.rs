use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::config_model::ApiConfig;
use crate::domain::repositories::collaborator::RecordingCollaborator;
use crate::domain::value_objects::collaborator::{
    DriveConfirmRequest, DriveConfirmed, DriveSession, DriveSessionRequest,
    MultipartAbortRequest, MultipartCompleteRequest, MultipartCompleted, MultipartCreateRequest,
    MultipartCreated, ProgressUpdate, SignPartRequest, SignedPartUrl, StartSessionRequest,
    StartSessionResponse,
};
use crate::uploaders::error::UploadError;

const CSRF_HEADER: &str = "X-CSRF-TOKEN";
const BODY_PREVIEW_CHARS: usize = 512;

/// reqwest-backed client for the companion app's recording endpoints.
pub struct RecordingApiHttp {
    client: reqwest::Client,
    base_url: String,
    csrf_token: String,
}

impl RecordingApiHttp {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Url::parse(&config.base_url).context("invalid upload API base URL")?;

        let client = reqwest::Client::builder()
            .build()
            .context("failed to build upload API http client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            csrf_token: config.csrf_token.clone(),
        })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(path, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| {
                UploadError::non_retryable_with_source(
                    format!("failed to decode response from {}", path),
                    err.into(),
                )
            })
    }

    async fn post_no_content<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.send(path, body).await.map(|_| ())
    }

    async fn send<B>(&self, path: &str, body: &B) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header(CSRF_HEADER, &self.csrf_token)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                UploadError::retryable_with_source(
                    format!("request to {} failed", path),
                    err.into(),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let preview = body_text
                .trim()
                .chars()
                .take(BODY_PREVIEW_CHARS)
                .collect::<String>();
            return Err(UploadError::non_retryable(format!(
                "collaborator call {} rejected (status {}); body={}",
                path,
                status.as_u16(),
                preview
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl RecordingCollaborator for RecordingApiHttp {
    async fn start_recording_session(
        &self,
        room_id: &str,
        request: StartSessionRequest,
    ) -> Result<StartSessionResponse> {
        let path = format!("/api/rooms/{}/recordings/start-session", room_id);
        self.post_json(&path, &request).await
    }

    async fn update_progress(
        &self,
        room_id: &str,
        recording_id: &str,
        update: ProgressUpdate,
    ) -> Result<()> {
        let path = format!("/api/rooms/{}/recordings/{}/progress", room_id, recording_id);
        self.post_no_content(&path, &update).await
    }

    async fn create_multipart_upload(
        &self,
        request: MultipartCreateRequest,
    ) -> Result<MultipartCreated> {
        self.post_json("/api/uploads/s3/multipart/create", &request)
            .await
    }

    async fn sign_part_upload(&self, request: SignPartRequest) -> Result<SignedPartUrl> {
        self.post_json("/api/uploads/s3/multipart/sign", &request)
            .await
    }

    async fn complete_multipart_upload(
        &self,
        request: MultipartCompleteRequest,
    ) -> Result<MultipartCompleted> {
        self.post_json("/api/uploads/s3/multipart/complete", &request)
            .await
    }

    async fn abort_multipart_upload(&self, request: MultipartAbortRequest) -> Result<()> {
        self.post_no_content("/api/uploads/s3/multipart/abort", &request)
            .await
    }

    async fn create_drive_session(
        &self,
        room_id: &str,
        request: DriveSessionRequest,
    ) -> Result<DriveSession> {
        let path = format!("/api/rooms/{}/recordings/google-drive-upload-url", room_id);
        self.post_json(&path, &request).await
    }

    async fn confirm_drive_upload(
        &self,
        room_id: &str,
        request: DriveConfirmRequest,
    ) -> Result<DriveConfirmed> {
        let path = format!("/api/rooms/{}/recordings/confirm-google-drive", room_id);
        self.post_json(&path, &request).await
    }
}

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::collaborator::{
    DriveConfirmRequest, DriveConfirmed, DriveSession, DriveSessionRequest,
    MultipartAbortRequest, MultipartCompleteRequest, MultipartCompleted, MultipartCreateRequest,
    MultipartCreated, ProgressUpdate, SignPartRequest, SignedPartUrl, StartSessionRequest,
    StartSessionResponse,
};

/// The companion app's recording endpoints. Everything
/// the uploaders need from the server side goes through this seam.
#[automock]
#[async_trait]
pub trait RecordingCollaborator {
    /// POST /api/rooms/{room_id}/recordings/start-session
    async fn start_recording_session(
        &self,
        room_id: &str,
        request: StartSessionRequest,
    ) -> Result<StartSessionResponse>;

    /// POST /api/rooms/{room_id}/recordings/{recording_id}/progress
    async fn update_progress(
        &self,
        room_id: &str,
        recording_id: &str,
        update: ProgressUpdate,
    ) -> Result<()>;

    /// POST /api/uploads/s3/multipart/create
    async fn create_multipart_upload(
        &self,
        request: MultipartCreateRequest,
    ) -> Result<MultipartCreated>;

    /// POST /api/uploads/s3/multipart/sign
    async fn sign_part_upload(&self, request: SignPartRequest) -> Result<SignedPartUrl>;

    /// POST /api/uploads/s3/multipart/complete
    async fn complete_multipart_upload(
        &self,
        request: MultipartCompleteRequest,
    ) -> Result<MultipartCompleted>;

    /// POST /api/uploads/s3/multipart/abort
    async fn abort_multipart_upload(&self, request: MultipartAbortRequest) -> Result<()>;

    /// POST /api/rooms/{room_id}/recordings/google-drive-upload-url
    async fn create_drive_session(
        &self,
        room_id: &str,
        request: DriveSessionRequest,
    ) -> Result<DriveSession>;

    /// POST /api/rooms/{room_id}/recordings/confirm-google-drive
    async fn confirm_drive_upload(
        &self,
        room_id: &str,
        request: DriveConfirmRequest,
    ) -> Result<DriveConfirmed>;
}

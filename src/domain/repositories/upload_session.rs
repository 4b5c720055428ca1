use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::value_objects::enums::providers::StorageProvider;
use crate::domain::value_objects::recording::{RecordingMetadata, UploadStats};

/// One live recording's upload strategy. An instance is exclusively owned by
/// a single recording session; `&mut self` receivers make overlapping chunk
/// submissions unrepresentable, so chunks upload strictly in call order.
///
/// Lifecycle: `initialize` once (with the first captured chunk as a size
/// hint), `upload_chunk` per captured chunk, then exactly one of `finalize`
/// or `abort`. `reset` returns the instance to its pre-initialize state so it
/// can serve a new recording.
#[async_trait]
pub trait UploadSession: Send {
    fn provider(&self) -> StorageProvider;

    /// Establishes the remote (or local) session. `is_uploading` becomes true
    /// only on success; on failure no partial session identifiers survive.
    async fn initialize(
        &mut self,
        metadata: RecordingMetadata,
        first_chunk: Bytes,
    ) -> Result<()>;

    /// Transmits or stores one chunk. Rejected with a "recording session is
    /// not active" error outside the initialize..finalize window.
    async fn upload_chunk(&mut self, chunk: Bytes) -> Result<()>;

    /// Flushes buffered data and completes the remote transaction. State is
    /// reset even when completion fails, so a session can never get stuck
    /// uploading. A no-op on an uploader that was never initialized.
    async fn finalize(&mut self) -> Result<()>;

    /// Best-effort remote cleanup; remote failures are logged, never
    /// propagated. Always leaves the instance reset.
    async fn abort(&mut self) -> Result<()>;

    /// Idempotent return to the pre-initialize state.
    fn reset(&mut self);

    fn stats(&self) -> UploadStats;
}

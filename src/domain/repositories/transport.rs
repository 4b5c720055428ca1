//! Direct-to-provider transport seams. Wasabi parts go straight to a
//! collaborator-signed URL; Google Drive chunks go straight to the resumable
//! session URI. Keeping these behind traits lets the uploaders' ordering,
//! retry and finalization behavior be exercised without a network.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use mockall::automock;
use std::collections::HashMap;
use std::time::Duration;

/// A byte range for a resumable PUT. `total` is `None` mid-stream (sent as
/// `*` on the wire) and concrete only on the final chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub total: Option<u64>,
}

impl ByteRange {
    pub fn header_value(&self) -> String {
        match self.total {
            Some(total) => format!("bytes {}-{}/{}", self.start, self.end, total),
            None => format!("bytes {}-{}/*", self.start, self.end),
        }
    }

    pub fn byte_len(&self) -> u64 {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PutPartOutcome {
    /// ETag response header, if the provider returned one. Header lookup is
    /// case-insensitive at the transport layer.
    pub etag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RangePutOutcome {
    /// HTTP 308: the session accepted the range and expects more.
    Incomplete,
    /// HTTP 200/201: the remote file is complete.
    Completed { file_id: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionProbe {
    Active,
    Gone,
}

#[automock]
#[async_trait]
pub trait SignedPartTransport {
    /// PUTs one multipart part to a pre-signed URL, applying any extra
    /// headers the signer demanded.
    async fn put_part(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: Bytes,
    ) -> Result<PutPartOutcome>;
}

#[automock]
#[async_trait]
pub trait ResumableTransport {
    /// PUTs one byte range to a resumable session URI. Errors carry the
    /// retryable / session-invalidated classification from `UploadError`.
    async fn put_range(
        &self,
        session_uri: &str,
        access_token: &str,
        range: ByteRange,
        body: Bytes,
        timeout: Duration,
    ) -> Result<RangePutOutcome>;

    /// Queries whether the session URI still accepts ranges.
    async fn probe_session(
        &self,
        session_uri: &str,
        access_token: &str,
        declared_size: u64,
        timeout: Duration,
    ) -> Result<SessionProbe>;
}

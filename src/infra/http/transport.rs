use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

use crate::domain::repositories::transport::{
    ByteRange, PutPartOutcome, RangePutOutcome, ResumableTransport, SessionProbe,
    SignedPartTransport,
};
use crate::uploaders::error::UploadError;

const BODY_PREVIEW_CHARS: usize = 512;
const RESUME_INCOMPLETE: u16 = 308;

/// reqwest-backed transport for direct-to-provider PUTs.
pub struct HttpProviderTransport {
    client: reqwest::Client,
}

impl HttpProviderTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build provider transport http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SignedPartTransport for HttpProviderTransport {
    async fn put_part(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: Bytes,
    ) -> Result<PutPartOutcome> {
        let mut request = self.client.put(url).body(body);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|err| {
            UploadError::retryable_with_source("signed part PUT failed", err.into())
        })?;

        let status = response.status();
        if !status.is_success() {
            let preview = body_preview(response).await;
            return Err(UploadError::non_retryable(format!(
                "signed part PUT rejected (status {}); body={}",
                status.as_u16(),
                preview
            )));
        }

        // reqwest header lookups are case-insensitive, so any ETag casing
        // the provider returns is matched.
        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(PutPartOutcome { etag })
    }
}

#[async_trait]
impl ResumableTransport for HttpProviderTransport {
    async fn put_range(
        &self,
        session_uri: &str,
        access_token: &str,
        range: ByteRange,
        body: Bytes,
        timeout: Duration,
    ) -> Result<RangePutOutcome> {
        let response = self
            .client
            .put(session_uri)
            .timeout(timeout)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", access_token),
            )
            .header(reqwest::header::CONTENT_RANGE, range.header_value())
            .body(body)
            .send()
            .await
            .map_err(|err| {
                UploadError::retryable_with_source("resumable chunk PUT failed", err.into())
            })?;

        interpret_resumable_response(response).await
    }

    async fn probe_session(
        &self,
        session_uri: &str,
        access_token: &str,
        declared_size: u64,
        timeout: Duration,
    ) -> Result<SessionProbe> {
        // An empty PUT with `bytes */{size}` asks the session for its status
        // without transferring data.
        let response = self
            .client
            .put(session_uri)
            .timeout(timeout)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", access_token),
            )
            .header(
                reqwest::header::CONTENT_RANGE,
                format!("bytes */{}", declared_size),
            )
            .send()
            .await
            .map_err(|err| {
                UploadError::retryable_with_source("resumable session probe failed", err.into())
            })?;

        match response.status().as_u16() {
            RESUME_INCOMPLETE | 200 | 201 => Ok(SessionProbe::Active),
            404 | 410 => Ok(SessionProbe::Gone),
            status => {
                let preview = body_preview(response).await;
                Err(UploadError::non_retryable(format!(
                    "resumable session probe rejected (status {}); body={}",
                    status, preview
                )))
            }
        }
    }
}

async fn interpret_resumable_response(response: reqwest::Response) -> Result<RangePutOutcome> {
    match response.status().as_u16() {
        RESUME_INCOMPLETE => Ok(RangePutOutcome::Incomplete),
        200 | 201 => {
            let file_id = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|value| {
                    value
                        .get("id")
                        .and_then(|id| id.as_str())
                        .map(str::to_string)
                });
            Ok(RangePutOutcome::Completed { file_id })
        }
        status @ (404 | 410) => Err(UploadError::session_invalidated(format!(
            "resumable session is gone (status {})",
            status
        ))),
        status => {
            let preview = body_preview(response).await;
            Err(UploadError::non_retryable(format!(
                "resumable chunk PUT rejected (status {}); body={}",
                status, preview
            )))
        }
    }
}

async fn body_preview(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_default()
        .trim()
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect()
}

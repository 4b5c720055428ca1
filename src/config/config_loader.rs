use anyhow::{Context, Result};
use std::path::PathBuf;

use super::config_model::{ApiConfig, GoogleDriveConfig, LocalDownloadConfig, UploaderConfig};

pub fn load() -> Result<UploaderConfig> {
    dotenvy::dotenv().ok();

    let api = ApiConfig {
        base_url: std::env::var("UPLOAD_API_BASE_URL").expect("UPLOAD_API_BASE_URL is invalid"),
        csrf_token: std::env::var("UPLOAD_API_CSRF_TOKEN")
            .expect("UPLOAD_API_CSRF_TOKEN is invalid"),
    };

    let google_drive = GoogleDriveConfig {
        declared_session_size_bytes: std::env::var("GOOGLE_DRIVE_DECLARED_SESSION_SIZE_BYTES")
            .unwrap_or_else(|_| "2147483648".to_string())
            .parse()
            .context("GOOGLE_DRIVE_DECLARED_SESSION_SIZE_BYTES is invalid")?,
        chunk_timeout_secs: std::env::var("GOOGLE_DRIVE_CHUNK_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("GOOGLE_DRIVE_CHUNK_TIMEOUT_SECS is invalid")?,
        session_probe_timeout_secs: std::env::var("GOOGLE_DRIVE_SESSION_PROBE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("GOOGLE_DRIVE_SESSION_PROBE_TIMEOUT_SECS is invalid")?,
        max_retries: std::env::var("GOOGLE_DRIVE_MAX_RETRIES")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .context("GOOGLE_DRIVE_MAX_RETRIES is invalid")?,
        backoff_base_secs: std::env::var("GOOGLE_DRIVE_BACKOFF_BASE_SECS")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .context("GOOGLE_DRIVE_BACKOFF_BASE_SECS is invalid")?,
    };

    let local = LocalDownloadConfig {
        output_dir: PathBuf::from(
            std::env::var("LOCAL_DOWNLOAD_DIR").unwrap_or_else(|_| "recordings".to_string()),
        ),
    };

    Ok(UploaderConfig {
        api,
        google_drive,
        local,
    })
}

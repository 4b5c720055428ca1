use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct UploaderConfig {
    pub api: ApiConfig,
    pub google_drive: GoogleDriveConfig,
    pub local: LocalDownloadConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// CSRF token sourced from page metadata; injected credential, sent on
    /// every collaborator call.
    pub csrf_token: String,
}

#[derive(Debug, Clone)]
pub struct GoogleDriveConfig {
    /// Declared total size for the resumable session. Only has to exceed any
    /// plausible recording; the final PUT always states the exact total.
    pub declared_session_size_bytes: u64,
    pub chunk_timeout_secs: u64,
    pub session_probe_timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl Default for GoogleDriveConfig {
    fn default() -> Self {
        Self {
            declared_session_size_bytes: 2 * 1024 * 1024 * 1024,
            chunk_timeout_secs: 60,
            session_probe_timeout_secs: 10,
            max_retries: 3,
            backoff_base_secs: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalDownloadConfig {
    /// Where finalized local recordings are written.
    pub output_dir: PathBuf,
}

use std::error::Error as StdError;

/// Error classification carried inside `anyhow::Error`. Retryable errors are
/// transient transport failures; session-invalidated errors mean the remote
/// resumable session is gone (404/410) and only a recreated session can
/// continue.
#[derive(Debug)]
pub struct UploadError {
    retryable: bool,
    session_invalidated: bool,
    message: String,
    source: Option<anyhow::Error>,
}

impl UploadError {
    pub fn retryable(message: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(Self {
            retryable: true,
            session_invalidated: false,
            message: message.into(),
            source: None,
        })
    }

    pub fn retryable_with_source(
        message: impl Into<String>,
        source: anyhow::Error,
    ) -> anyhow::Error {
        anyhow::Error::new(Self {
            retryable: true,
            session_invalidated: false,
            message: message.into(),
            source: Some(source),
        })
    }

    pub fn non_retryable(message: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(Self {
            retryable: false,
            session_invalidated: false,
            message: message.into(),
            source: None,
        })
    }

    pub fn non_retryable_with_source(
        message: impl Into<String>,
        source: anyhow::Error,
    ) -> anyhow::Error {
        anyhow::Error::new(Self {
            retryable: false,
            session_invalidated: false,
            message: message.into(),
            source: Some(source),
        })
    }

    pub fn session_invalidated(message: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(Self {
            retryable: false,
            session_invalidated: true,
            message: message.into(),
            source: None,
        })
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn is_session_invalidated(&self) -> bool {
        self.session_invalidated
    }
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for UploadError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|err| err.as_ref())
    }
}

/// Unclassified errors count as retryable: a raised transport exception is
/// retried the same way a classified transient failure is.
pub fn error_is_retryable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<UploadError>()
        .map_or(true, UploadError::is_retryable)
}

pub fn error_invalidated_session(err: &anyhow::Error) -> bool {
    err.downcast_ref::<UploadError>()
        .is_some_and(UploadError::is_session_invalidated)
}

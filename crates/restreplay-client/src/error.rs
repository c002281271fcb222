//! Caller-visible failures

use restreplay_core::{ErrorPayload, HarnessError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The service answered with an error; Display is the message verbatim.
    #[error("{error}")]
    Service { status: u16, error: ErrorPayload },
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("malformed response from {path}: {reason}")]
    Malformed { path: String, reason: String },
    #[error("job {href} failed: {message}")]
    JobFailed { href: String, message: String },
    #[error("job {href} not finished after {polls} poll(s)")]
    JobTimeout { href: String, polls: u32 },
}

impl ClientError {
    /// Service error code, when the error payload carries one.
    #[must_use]
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Service { error, .. } => error.code(),
            _ => None,
        }
    }

    /// The replay harness failure behind a transport error, if that is
    /// what it is.
    #[must_use]
    pub fn harness_error(&self) -> Option<&HarnessError> {
        match self {
            Self::Transport(source) => source.downcast_ref::<HarnessError>(),
            _ => None,
        }
    }
}

//! Error types for the Aurora client

use std::time::Duration;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Aurora client error
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connection, TLS, per-request timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Login rejected by the service
    #[error("login failed with status {status}: {body}")]
    Auth { status: u16, body: String },

    /// Response body could not be parsed
    #[error("malformed response body: {source} (body: {body})")]
    Protocol {
        source: serde_json::Error,
        body: String,
    },

    /// Response parsed but violated the protocol shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Service explicitly reported a failure
    #[error("service error {status}: {body}")]
    Service { status: u16, body: String },

    /// Remote task execution failed
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// Session rejected again right after re-authentication
    #[error("session expired after re-authentication")]
    SessionExpired,

    /// Request failed local validation before sending
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Poll deadline elapsed before results were ready
    #[error("poll deadline of {0:?} elapsed before results were ready")]
    DeadlineExceeded(Duration),
}

impl ClientError {
    /// Build a protocol error from an unparseable body, keeping the raw
    /// text for diagnostics.
    pub(crate) fn protocol(source: serde_json::Error, body: impl Into<String>) -> Self {
        ClientError::Protocol {
            source,
            body: body.into(),
        }
    }
}

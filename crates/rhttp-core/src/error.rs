//! Error taxonomy surfaced to callers of the client.
//!
//! Every failure a caller can observe is one of these variants; raw
//! transport types (curl errors, join errors) are converted at the
//! boundary by [`crate::retry::into_http_error`].

use thiserror::Error;

use crate::retry::ErrorKind;

/// Classified failure returned by the client and the retry executor.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection refused, DNS failure, or another network-level failure.
    #[error("connection error: {0}")]
    Connection(String),
    /// Connect, read, pool, or overall timeout of a single attempt.
    #[error("request timeout: {0}")]
    Timeout(String),
    /// The request was rejected before anything was sent.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Non-success HTTP status.
    #[error("HTTP {status} error for URL {url}")]
    Status { status: u16, url: String },
    /// Attempts were exhausted after at least one retry.
    #[error("maximum retry attempts ({max_retries}) exceeded. Last error: {source}")]
    RetryExhausted {
        max_retries: u32,
        #[source]
        source: Box<HttpError>,
    },
    /// Anything that fits no other class.
    #[error("{0}")]
    Other(String),
}

impl HttpError {
    /// Normalized category. `RetryExhausted` reports the kind of the error it wraps.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HttpError::Connection(_) => ErrorKind::Connection,
            HttpError::Timeout(_) => ErrorKind::Timeout,
            HttpError::Validation(_) => ErrorKind::Validation,
            HttpError::Status { .. } => ErrorKind::Status,
            HttpError::RetryExhausted { source, .. } => source.kind(),
            HttpError::Other(_) => ErrorKind::Unknown,
        }
    }

    /// HTTP status code carried by this error (or the error it wraps).
    pub fn status_code(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::RetryExhausted { source, .. } => source.status_code(),
            _ => None,
        }
    }

    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, HttpError::RetryExhausted { .. })
    }
}

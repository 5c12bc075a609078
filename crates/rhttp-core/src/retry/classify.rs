//! Classify transport failures into retry decisions and caller-facing errors.

use super::error::TransportError;
use super::policy::{ErrorKind, RetryDecision};
use crate::error::HttpError;

/// Map a failed attempt to a retry decision. Pure and total.
///
/// Connectivity and timeout failures are retried; status, validation and
/// unknown failures are not.
pub fn classify(e: &TransportError) -> RetryDecision {
    match e {
        TransportError::Connect(_) | TransportError::Dns(_) | TransportError::Network(_) => {
            RetryDecision::retry(ErrorKind::Connection)
        }
        TransportError::Timeout { .. } => RetryDecision::retry(ErrorKind::Timeout),
        TransportError::Status { .. } => RetryDecision::fatal(ErrorKind::Status),
        TransportError::Malformed(_) => RetryDecision::fatal(ErrorKind::Validation),
        TransportError::Other(_) => RetryDecision::fatal(ErrorKind::Unknown),
    }
}

/// Convert a transport failure into the caller-facing taxonomy.
pub fn into_http_error(e: TransportError) -> HttpError {
    match e {
        TransportError::Connect(_) | TransportError::Dns(_) | TransportError::Network(_) => {
            HttpError::Connection(e.to_string())
        }
        TransportError::Timeout { .. } => HttpError::Timeout(e.to_string()),
        TransportError::Status { status, url } => HttpError::Status { status, url },
        TransportError::Malformed(m) => HttpError::Validation(m),
        TransportError::Other(m) => HttpError::Other(m),
    }
}

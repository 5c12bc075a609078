//! Failure raised by a single transport attempt, before classification.

use std::fmt;

/// Which timeout fired during an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
    Connect,
    Read,
    Pool,
    Overall,
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeoutPhase::Connect => "connect",
            TimeoutPhase::Read => "read",
            TimeoutPhase::Pool => "pool",
            TimeoutPhase::Overall => "overall",
        };
        f.write_str(s)
    }
}

/// Error returned by one attempt of the transport operation.
/// Kept separate from [`crate::HttpError`] so the executor can classify and
/// decide retries before converting to the caller-facing taxonomy.
#[derive(Debug)]
pub enum TransportError {
    /// Connection refused or reset while connecting.
    Connect(String),
    /// Host or proxy name could not be resolved.
    Dns(String),
    /// Send/receive failure or empty reply after connecting.
    Network(String),
    /// A timeout fired.
    Timeout { phase: TimeoutPhase, message: String },
    /// The transport surfaced an HTTP status as an error.
    Status { status: u16, url: String },
    /// The request could not be built (bad URL, unsupported scheme).
    Malformed(String),
    /// Anything else.
    Other(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect(m) => write!(f, "connect failed: {}", m),
            TransportError::Dns(m) => write!(f, "name resolution failed: {}", m),
            TransportError::Network(m) => write!(f, "network error: {}", m),
            TransportError::Timeout { phase, message } => {
                write!(f, "{} timeout: {}", phase, message)
            }
            TransportError::Status { status, url } => {
                write!(f, "HTTP {} error for URL {}", status, url)
            }
            TransportError::Malformed(m) => write!(f, "malformed request: {}", m),
            TransportError::Other(m) => write!(f, "{}", m),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<curl::Error> for TransportError {
    fn from(e: curl::Error) -> Self {
        let message = e.to_string();
        if e.is_operation_timedout() {
            return TransportError::Timeout {
                phase: TimeoutPhase::Overall,
                message,
            };
        }
        if e.is_couldnt_resolve_host() || e.is_couldnt_resolve_proxy() {
            return TransportError::Dns(message);
        }
        if e.is_couldnt_connect() {
            return TransportError::Connect(message);
        }
        if e.is_read_error()
            || e.is_recv_error()
            || e.is_send_error()
            || e.is_got_nothing()
            || e.is_partial_file()
            || e.is_ssl_connect_error()
        {
            return TransportError::Network(message);
        }
        if e.is_url_malformed() || e.is_unsupported_protocol() {
            return TransportError::Malformed(message);
        }
        TransportError::Other(message)
    }
}

//! Retry and backoff policy.
//!
//! This module encapsulates failure classification (connectivity, timeouts,
//! status, validation) and exponential backoff so that the blocking and
//! cooperative request paths share one consistent policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, into_http_error};
pub use error::{TimeoutPhase, TransportError};
pub use policy::{BackoffPolicy, ErrorKind, RetryConfig, RetryDecision, MAX_DELAY};
pub use run::{AttemptOutcome, AttemptRecord, RetryExecutor};

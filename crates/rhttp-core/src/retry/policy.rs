use std::fmt;
use std::time::Duration;

use crate::error::HttpError;

/// Upper bound on any single backoff delay.
pub const MAX_DELAY: Duration = Duration::from_secs(60);

/// Normalized category of a failure, shared by retry decisions and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection refused, DNS failure, generic network error.
    Connection,
    /// Connect/read/pool/overall timeout.
    Timeout,
    /// Malformed request caught before send.
    Validation,
    /// HTTP status surfaced as an error by the transport.
    Status,
    /// Any other error (never retried).
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Connection => "ConnectionError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Status => "HttpStatusError",
            ErrorKind::Unknown => "UnknownError",
        };
        f.write_str(name)
    }
}

/// Outcome of classifying one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retryable: bool,
    pub kind: ErrorKind,
}

impl RetryDecision {
    pub const fn retry(kind: ErrorKind) -> Self {
        Self {
            retryable: true,
            kind,
        }
    }

    pub const fn fatal(kind: ErrorKind) -> Self {
        Self {
            retryable: false,
            kind,
        }
    }
}

/// Deterministic exponential backoff: `base * multiplier^(attempt-1)`, capped at [`MAX_DELAY`].
///
/// No jitter is applied, so equal inputs always produce equal delays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    base_delay: Duration,
    multiplier: f64,
}

impl BackoffPolicy {
    /// Build a policy. `base_delay` must be non-zero and `multiplier` finite and `>= 1`.
    pub fn new(base_delay: Duration, multiplier: f64) -> Result<Self, HttpError> {
        if base_delay.is_zero() {
            return Err(HttpError::Validation(
                "retry base delay must be greater than zero".to_string(),
            ));
        }
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(HttpError::Validation(format!(
                "retry backoff multiplier must be >= 1, got {multiplier}"
            )));
        }
        Ok(Self {
            base_delay,
            multiplier,
        })
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exp);
        if !secs.is_finite() || secs >= MAX_DELAY.as_secs_f64() {
            return MAX_DELAY;
        }
        Duration::from_secs_f64(secs)
    }
}

/// Retry parameters owned by a [`super::RetryExecutor`]. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    max_retries: u32,
    backoff: BackoffPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffPolicy {
                base_delay: Duration::from_secs(1),
                multiplier: 2.0,
            },
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay: Duration, multiplier: f64) -> Result<Self, HttpError> {
        Ok(Self {
            max_retries,
            backoff: BackoffPolicy::new(base_delay, multiplier)?,
        })
    }

    /// Like [`RetryConfig::new`] with the base delay given in (fractional) seconds.
    pub fn from_secs(
        max_retries: u32,
        base_delay_secs: f64,
        multiplier: f64,
    ) -> Result<Self, HttpError> {
        let base_delay = Duration::try_from_secs_f64(base_delay_secs).map_err(|_| {
            HttpError::Validation(format!(
                "retry base delay must be a positive number of seconds, got {base_delay_secs}"
            ))
        })?;
        Self::new(max_retries, base_delay, multiplier)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn max_delay_cap(&self) -> Duration {
        MAX_DELAY
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.delay_for(attempt)
    }
}

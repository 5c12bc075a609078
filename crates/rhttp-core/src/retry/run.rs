//! Retry loop: run an attempt until success, a fatal error, or exhaustion.

use std::future::Future;
use std::time::{Duration, Instant};

use super::classify::{classify, into_http_error};
use super::error::TransportError;
use super::policy::{ErrorKind, RetryConfig};
use crate::error::HttpError;
use crate::request_logger::RequestLogger;

/// How one attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    RetryableError,
    FatalError,
}

/// Per-attempt bookkeeping; logged and then dropped.
#[derive(Debug, Clone, Copy)]
pub struct AttemptRecord {
    /// 1-based attempt index.
    pub attempt: u32,
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
    pub kind: Option<ErrorKind>,
}

impl AttemptRecord {
    fn trace(&self, target: &str) {
        tracing::debug!(
            attempt = self.attempt,
            elapsed_ms = self.elapsed.as_millis() as u64,
            outcome = ?self.outcome,
            kind = ?self.kind,
            "attempt finished for {}",
            target
        );
    }
}

enum Next {
    Retry(Duration),
    Fail(HttpError),
}

/// Drives repeated invocation of a single-attempt operation.
///
/// The executor keeps no state between calls; one instance may serve many
/// concurrent `execute`/`execute_async` calls.
#[derive(Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
    logger: Option<RequestLogger>,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            logger: None,
        }
    }

    /// Emit retry events through `logger`.
    pub fn with_logger(mut self, logger: RequestLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Blocking mode: attempts and backoff sleeps run on the calling thread.
    ///
    /// `target` names the request (usually its URL) in retry events.
    pub fn execute<T, F>(&self, target: &str, mut operation: F) -> Result<T, HttpError>
    where
        F: FnMut() -> Result<T, TransportError>,
    {
        let mut attempt = 1u32;
        loop {
            let started = Instant::now();
            match operation() {
                Ok(value) => {
                    self.record_success(attempt, started.elapsed(), target);
                    return Ok(value);
                }
                Err(e) => match self.after_failure(attempt, started.elapsed(), e, target) {
                    Next::Fail(err) => return Err(err),
                    Next::Retry(delay) => {
                        std::thread::sleep(delay);
                        attempt += 1;
                    }
                },
            }
        }
    }

    /// Cooperative mode: backoff is a `tokio` timer, so other tasks run during
    /// the delay and dropping the future cancels the sequence.
    pub async fn execute_async<T, F, Fut>(
        &self,
        target: &str,
        mut operation: F,
    ) -> Result<T, HttpError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut attempt = 1u32;
        loop {
            let started = Instant::now();
            match operation().await {
                Ok(value) => {
                    self.record_success(attempt, started.elapsed(), target);
                    return Ok(value);
                }
                Err(e) => match self.after_failure(attempt, started.elapsed(), e, target) {
                    Next::Fail(err) => return Err(err),
                    Next::Retry(delay) => {
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                },
            }
        }
    }

    fn record_success(&self, attempt: u32, elapsed: Duration, target: &str) {
        AttemptRecord {
            attempt,
            elapsed,
            outcome: AttemptOutcome::Success,
            kind: None,
        }
        .trace(target);
    }

    /// Shared decision step for both modes, so they yield identical attempt sequences.
    fn after_failure(
        &self,
        attempt: u32,
        elapsed: Duration,
        e: TransportError,
        target: &str,
    ) -> Next {
        let decision = classify(&e);
        AttemptRecord {
            attempt,
            elapsed,
            outcome: if decision.retryable {
                AttemptOutcome::RetryableError
            } else {
                AttemptOutcome::FatalError
            },
            kind: Some(decision.kind),
        }
        .trace(target);

        if attempt >= self.config.max_attempts() {
            let classified = into_http_error(e);
            if attempt > 1 {
                return Next::Fail(HttpError::RetryExhausted {
                    max_retries: self.config.max_retries(),
                    source: Box::new(classified),
                });
            }
            return Next::Fail(classified);
        }

        if !decision.retryable {
            return Next::Fail(into_http_error(e));
        }

        let delay = self.config.delay_for(attempt);
        if let Some(logger) = &self.logger {
            logger.log_retry(
                attempt,
                self.config.max_retries(),
                delay,
                decision.kind,
                &e,
                target,
            );
        }
        Next::Retry(delay)
    }
}

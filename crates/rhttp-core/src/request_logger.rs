//! Request/response/retry/error events written through a log sink entry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde_json::json;

use crate::config::ClientConfig;
use crate::request::{Body, Headers, Method};
use crate::retry::ErrorKind;
use crate::sinks::{Level, LogSinkEntry, LogSinkRegistry};

pub const REDACTED: &str = "***REDACTED***";

/// Header names whose values never reach a log line (compared ignoring case).
pub const SENSITIVE_HEADERS: [&str; 8] = [
    "authorization",
    "cookie",
    "x-api-key",
    "x-auth-token",
    "x-access-token",
    "bearer",
    "api-key",
    "auth-token",
];

const MAX_LOGGED_BODY_CHARS: usize = 500;

pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(name))
}

/// Header map safe to log: sensitive values replaced with [`REDACTED`].
pub fn redact_headers(headers: &Headers) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| {
            let value = if is_sensitive_header(k) { REDACTED } else { v };
            (k.to_string(), value.to_string())
        })
        .collect()
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Emits HTTP events through one registry entry. Cheap to clone.
///
/// Emission never fails; disabled categories are dropped silently.
#[derive(Clone)]
pub struct RequestLogger {
    entry: Arc<LogSinkEntry>,
    log_requests: bool,
    log_responses: bool,
}

impl fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogger")
            .field("instance", &self.entry.name())
            .field("log_requests", &self.log_requests)
            .field("log_responses", &self.log_responses)
            .finish()
    }
}

impl RequestLogger {
    pub fn new(entry: Arc<LogSinkEntry>, log_requests: bool, log_responses: bool) -> Self {
        Self {
            entry,
            log_requests,
            log_responses,
        }
    }

    /// Reconfigure the client's registry instance from `config` and log through it.
    pub fn from_config(registry: &LogSinkRegistry, config: &ClientConfig) -> Self {
        let sink = config.log_file_sink();
        let entry = registry.reconfigure(&config.logger_name, config.log_level, sink.as_ref());
        Self::new(entry, config.log_requests, config.log_responses)
    }

    pub fn entry(&self) -> &Arc<LogSinkEntry> {
        &self.entry
    }

    #[track_caller]
    pub fn log_request(&self, method: Method, url: &str, headers: &Headers, body: Option<&Body>) {
        if !self.log_requests {
            return;
        }
        self.entry.info(format_args!("Request: {} {}", method, url));

        if self.entry.is_enabled_for(Level::Debug) {
            let mut details = json!({
                "type": "request",
                "method": method.as_str(),
                "url": url,
                "timestamp": timestamp(),
                "headers": redact_headers(headers),
            });
            if let Some(body) = body {
                let data: String = body.preview().chars().take(MAX_LOGGED_BODY_CHARS).collect();
                details["data"] = json!(data);
            }
            self.entry.debug(format_args!("Request details: {}", details));
        }
    }

    #[track_caller]
    pub fn log_response(
        &self,
        status: u16,
        url: &str,
        elapsed: Duration,
        headers: &Headers,
        content_length: usize,
    ) {
        if !self.log_responses {
            return;
        }
        let level = if (200..400).contains(&status) {
            Level::Info
        } else {
            Level::Warning
        };
        self.entry.log(
            level,
            format_args!(
                "Response: {} {} ({:.3}s)",
                status,
                url,
                elapsed.as_secs_f64()
            ),
        );

        if self.entry.is_enabled_for(Level::Debug) {
            let details = json!({
                "type": "response",
                "status_code": status,
                "url": url,
                "elapsed_time": elapsed.as_secs_f64(),
                "timestamp": timestamp(),
                "headers": redact_headers(headers),
                "content_length": content_length,
            });
            self.entry.debug(format_args!("Response details: {}", details));
        }
    }

    #[track_caller]
    pub fn log_retry(
        &self,
        attempt: u32,
        max_retries: u32,
        delay: Duration,
        kind: ErrorKind,
        error: &dyn fmt::Display,
        url: &str,
    ) {
        self.entry.warning(format_args!(
            "Retry {}/{} for {} after {:.1}s delay. Error: {}: {}",
            attempt,
            max_retries,
            url,
            delay.as_secs_f64(),
            kind,
            error
        ));
    }

    /// `WARNING` line naming the bound that fired.
    #[track_caller]
    pub fn log_timeout(&self, method: Method, url: &str, timeout: Duration) {
        self.entry.warning(format_args!(
            "Timeout ({:?}s) for {} {}",
            timeout.as_secs_f64(),
            method,
            url
        ));
    }

    #[track_caller]
    pub fn log_connection_error(&self, method: Method, url: &str, error: &dyn fmt::Display) {
        self.entry.warning(format_args!(
            "Connection error for {} {}: {}",
            method, url, error
        ));
    }

    #[track_caller]
    pub fn log_error(&self, method: Method, url: &str, kind: ErrorKind, error: &dyn fmt::Display) {
        self.entry.error(format_args!(
            "Error in {} {}: {}: {}",
            method, url, kind, error
        ));
    }
}

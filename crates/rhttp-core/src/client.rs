//! HTTP client: request preparation, retries and request logging.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{ClientConfig, Timeouts};
use crate::error::HttpError;
use crate::request::{check_timeout, Body, Headers, Method, RequestSpec};
use crate::request_logger::RequestLogger;
use crate::response::Response;
use crate::retry::{classify, ErrorKind, RetryExecutor, TransportError};
use crate::sinks::LogSinkRegistry;
use crate::transport::{CurlTransport, PreparedRequest, Transport};

/// Client with retry, backoff and request logging.
///
/// Blocking methods run attempts and backoff on the calling thread. The
/// `*_async` methods need a tokio runtime: each attempt runs on the blocking
/// pool and backoff is a tokio timer.
///
/// Any returned `Response` may have a non-2xx status; use
/// [`Response::raise_for_status`] to turn that into an error.
#[derive(Clone)]
pub struct HttpClient {
    config: ClientConfig,
    timeouts: Timeouts,
    default_headers: Headers,
    transport: Arc<dyn Transport>,
    executor: RetryExecutor,
    logger: RequestLogger,
}

impl HttpClient {
    /// Client over libcurl, logging through `registry`'s `config.logger_name` instance.
    pub fn new(config: ClientConfig, registry: &LogSinkRegistry) -> Result<Self, HttpError> {
        Self::with_transport(config, registry, Arc::new(CurlTransport::new()))
    }

    pub fn with_transport(
        config: ClientConfig,
        registry: &LogSinkRegistry,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, HttpError> {
        let timeouts = config.timeouts()?;
        let retry = config.retry_config()?;
        let logger = RequestLogger::from_config(registry, &config);
        let executor = RetryExecutor::new(retry).with_logger(logger.clone());
        tracing::debug!(
            instance = %config.logger_name,
            max_retries = config.max_retries,
            "http client ready"
        );
        Ok(Self {
            default_headers: config.default_headers(),
            config,
            timeouts,
            transport,
            executor,
            logger,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn default_headers(&self) -> &Headers {
        &self.default_headers
    }

    pub fn logger(&self) -> &RequestLogger {
        &self.logger
    }

    /// Merge defaults and resolve timeouts for one request.
    ///
    /// Fails with `Validation` on malformed headers or a per-request timeout
    /// under [`MIN_TIMEOUT`](crate::request::MIN_TIMEOUT); nothing is sent in that case.
    pub fn prepare(&self, spec: &RequestSpec) -> Result<PreparedRequest, HttpError> {
        let mut headers = if spec.uses_default_headers() {
            spec.header_list().layered_over(&self.default_headers)
        } else {
            spec.header_list().clone()
        };
        headers.validate()?;
        let timeout = match spec.request_timeout() {
            Some(t) => check_timeout("timeout", t)?,
            None => self.timeouts.overall,
        };
        let body = match spec.body() {
            Some(body) => {
                if let Some(ct) = body.content_type() {
                    if !headers.contains("Content-Type") {
                        headers.insert("Content-Type", ct);
                    }
                }
                Some(body.to_bytes()?)
            }
            None => None,
        };
        Ok(PreparedRequest {
            method: spec.method(),
            url: spec.target_url().to_string(),
            headers,
            body,
            timeout,
            connect_timeout: self.timeouts.connect,
            read_timeout: self.timeouts.read,
            follow_redirects: self.config.follow_redirects,
            verify_ssl: self.config.verify_ssl,
        })
    }

    /// Send `spec`, retrying connection failures and timeouts.
    pub fn request(&self, spec: RequestSpec) -> Result<Response, HttpError> {
        let prepared = self.prepare(&spec)?;
        self.executor.execute(&prepared.url, || {
            perform_attempt(self.transport.as_ref(), &self.logger, &prepared, spec.body())
        })
    }

    pub async fn request_async(&self, spec: RequestSpec) -> Result<Response, HttpError> {
        let prepared = Arc::new(self.prepare(&spec)?);
        let body: Option<Arc<Body>> = spec.body().cloned().map(Arc::new);
        let target = prepared.url.clone();
        self.executor
            .execute_async(&target, || {
                let transport = Arc::clone(&self.transport);
                let logger = self.logger.clone();
                let prepared = Arc::clone(&prepared);
                let body = body.clone();
                async move {
                    tokio::task::spawn_blocking(move || {
                        perform_attempt(transport.as_ref(), &logger, &prepared, body.as_deref())
                    })
                    .await
                    .unwrap_or_else(|e| {
                        Err(TransportError::Other(format!("attempt task failed: {}", e)))
                    })
                }
            })
            .await
    }

    pub fn get(&self, url: &str) -> Result<Response, HttpError> {
        self.request(RequestSpec::with_method(Method::Get, url)?)
    }

    pub fn post(&self, url: &str, body: Body) -> Result<Response, HttpError> {
        self.request(RequestSpec::with_method(Method::Post, url)?.with_body(body))
    }

    pub fn put(&self, url: &str, body: Body) -> Result<Response, HttpError> {
        self.request(RequestSpec::with_method(Method::Put, url)?.with_body(body))
    }

    pub fn patch(&self, url: &str, body: Body) -> Result<Response, HttpError> {
        self.request(RequestSpec::with_method(Method::Patch, url)?.with_body(body))
    }

    pub fn delete(&self, url: &str) -> Result<Response, HttpError> {
        self.request(RequestSpec::with_method(Method::Delete, url)?)
    }

    pub fn head(&self, url: &str) -> Result<Response, HttpError> {
        self.request(RequestSpec::with_method(Method::Head, url)?)
    }

    pub fn options(&self, url: &str) -> Result<Response, HttpError> {
        self.request(RequestSpec::with_method(Method::Options, url)?)
    }

    pub async fn get_async(&self, url: &str) -> Result<Response, HttpError> {
        self.request_async(RequestSpec::with_method(Method::Get, url)?)
            .await
    }

    pub async fn post_async(&self, url: &str, body: Body) -> Result<Response, HttpError> {
        self.request_async(RequestSpec::with_method(Method::Post, url)?.with_body(body))
            .await
    }

    pub async fn put_async(&self, url: &str, body: Body) -> Result<Response, HttpError> {
        self.request_async(RequestSpec::with_method(Method::Put, url)?.with_body(body))
            .await
    }

    pub async fn patch_async(&self, url: &str, body: Body) -> Result<Response, HttpError> {
        self.request_async(RequestSpec::with_method(Method::Patch, url)?.with_body(body))
            .await
    }

    pub async fn delete_async(&self, url: &str) -> Result<Response, HttpError> {
        self.request_async(RequestSpec::with_method(Method::Delete, url)?)
            .await
    }

    pub async fn head_async(&self, url: &str) -> Result<Response, HttpError> {
        self.request_async(RequestSpec::with_method(Method::Head, url)?)
            .await
    }

    pub async fn options_async(&self, url: &str) -> Result<Response, HttpError> {
        self.request_async(RequestSpec::with_method(Method::Options, url)?)
            .await
    }
}

/// One attempt: log request, send, log response or error.
///
/// A failure logs a timeout or connection `WARNING` when it is one, then
/// the `ERROR` line every failed attempt gets.
fn perform_attempt(
    transport: &dyn Transport,
    logger: &RequestLogger,
    request: &PreparedRequest,
    body: Option<&Body>,
) -> Result<Response, TransportError> {
    logger.log_request(request.method, &request.url, &request.headers, body);
    let started = Instant::now();
    match transport.send(request) {
        Ok(raw) => {
            let elapsed = started.elapsed();
            logger.log_response(raw.status, &raw.url, elapsed, &raw.headers, raw.body.len());
            Ok(Response::from_raw(raw, elapsed))
        }
        Err(e) => {
            let kind = classify(&e).kind;
            match (&e, kind) {
                (TransportError::Timeout { phase, .. }, _) => {
                    logger.log_timeout(request.method, &request.url, request.timeout_for(*phase));
                }
                (_, ErrorKind::Connection) => {
                    logger.log_connection_error(request.method, &request.url, &e);
                }
                _ => {}
            }
            logger.log_error(request.method, &request.url, kind, &e);
            Err(e)
        }
    }
}

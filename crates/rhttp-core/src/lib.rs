pub mod config;
pub mod logging;

pub mod client;
pub mod error;
pub mod request;
pub mod request_logger;
pub mod response;
pub mod retry;
pub mod sinks;
pub mod transport;

pub use client::HttpClient;
pub use config::{ClientConfig, LoggingConfig, Settings};
pub use error::HttpError;
pub use request::{Body, Headers, Method, RequestSpec};
pub use request_logger::RequestLogger;
pub use response::Response;
pub use retry::{ErrorKind, RetryConfig, RetryExecutor, TransportError};
pub use sinks::{Level, LogSinkEntry, LogSinkRegistry, ResetTarget};
pub use transport::{CurlTransport, RawResponse, Transport};

//! Single-attempt HTTP transport.
//!
//! Uses the curl crate (libcurl). A transport performs exactly one exchange
//! and never fails on an HTTP status; retries and status checks belong to
//! the client.

use std::str;
use std::time::Duration;

use crate::request::{Headers, Method};
use crate::retry::{TimeoutPhase, TransportError};

/// Everything needed to send one attempt, with defaults already merged in.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    /// Final URL including the query string.
    pub url: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Abort when no data arrives for this long.
    pub read_timeout: Duration,
    pub follow_redirects: bool,
    pub verify_ssl: bool,
}

impl PreparedRequest {
    /// The configured bound for a timeout `phase`.
    pub fn timeout_for(&self, phase: TimeoutPhase) -> Duration {
        match phase {
            TimeoutPhase::Connect => self.connect_timeout,
            TimeoutPhase::Read => self.read_timeout,
            TimeoutPhase::Pool | TimeoutPhase::Overall => self.timeout,
        }
    }
}

/// Status, headers and body of one exchange, before any decoding.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Headers of the final response (after redirects).
    pub headers: Headers,
    pub body: Vec<u8>,
    /// URL that produced the response.
    pub url: String,
}

impl RawResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// `charset` parameter of `Content-Type`, if declared.
    pub fn encoding(&self) -> Option<String> {
        let ct = self.content_type()?;
        ct.split(';').skip(1).find_map(|param| {
            let (k, v) = param.split_once('=')?;
            if k.trim().eq_ignore_ascii_case("charset") {
                Some(v.trim().trim_matches('"').to_string())
            } else {
                None
            }
        })
    }
}

/// Performs one HTTP exchange. Implementations block the calling thread.
pub trait Transport: Send + Sync {
    fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError>;
}

/// libcurl-backed transport; a fresh easy handle per attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlTransport;

impl CurlTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for CurlTransport {
    fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(&request.url)?;

        match request.method {
            Method::Get => easy.get(true)?,
            Method::Head => easy.nobody(true)?,
            Method::Post => easy.post(true)?,
            other => easy.custom_request(other.as_str())?,
        }
        if let Some(body) = &request.body {
            easy.post_fields_copy(body)?;
        } else if request.method == Method::Post {
            easy.post_field_size(0)?;
        }

        easy.follow_location(request.follow_redirects)?;
        easy.connect_timeout(request.connect_timeout)?;
        easy.timeout(request.timeout)?;
        // A transfer slower than 1 byte/s for read_timeout counts as stalled.
        easy.low_speed_limit(1)?;
        easy.low_speed_time(request.read_timeout)?;
        easy.ssl_verify_peer(request.verify_ssl)?;
        easy.ssl_verify_host(request.verify_ssl)?;

        let mut list = curl::easy::List::new();
        for (k, v) in request.headers.iter() {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if request.body.is_some() && !request.headers.contains("Expect") {
            list.append("Expect:")?;
        }
        easy.http_headers(list)?;

        let mut header_lines: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    // Each hop of a redirect chain starts a new header block.
                    if s.starts_with("HTTP/") {
                        header_lines.clear();
                    }
                    header_lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        let url = easy
            .effective_url()?
            .map(str::to_string)
            .unwrap_or_else(|| request.url.clone());
        let status = u16::try_from(status)
            .map_err(|_| TransportError::Malformed(format!("invalid status code {}", status)))?;

        Ok(RawResponse {
            status,
            headers: parse_headers(&header_lines),
            body,
            url,
        })
    }
}

/// Parse collected header lines; the status line and blank lines are skipped.
fn parse_headers(lines: &[String]) -> Headers {
    let mut headers = Headers::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with("HTTP/") {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim(), value.trim());
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_headers_skips_status_line() {
        let lines = [
            "HTTP/1.1 200 OK".to_string(),
            "Content-Type: application/json; charset=utf-8".to_string(),
            "X-Request-Id: abc:def".to_string(),
            "".to_string(),
        ];
        let h = parse_headers(&lines);
        assert_eq!(h.len(), 2);
        assert_eq!(h.get("content-type"), Some("application/json; charset=utf-8"));
        assert_eq!(h.get("x-request-id"), Some("abc:def"));
    }

    #[test]
    fn encoding_from_content_type() {
        let mut raw = RawResponse::default();
        assert_eq!(raw.encoding(), None);
        raw.headers.insert("Content-Type", "text/html; Charset=\"ISO-8859-1\"");
        assert_eq!(raw.encoding().as_deref(), Some("ISO-8859-1"));
        raw.headers.insert("Content-Type", "text/plain");
        assert_eq!(raw.encoding(), None);
        assert_eq!(raw.content_type(), Some("text/plain"));
    }
}

//! Request description: method, URL, headers, query and body.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::HttpError;

/// Shortest timeout the transport enforces; libcurl reads a zero as "none".
pub const MIN_TIMEOUT: Duration = Duration::from_millis(1);

pub(crate) fn check_timeout(name: &str, timeout: Duration) -> Result<Duration, HttpError> {
    if timeout < MIN_TIMEOUT {
        return Err(HttpError::Validation(format!(
            "{} must be at least {:?}, got {:?}",
            name, MIN_TIMEOUT, timeout
        )));
    }
    Ok(timeout)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(HttpError::Validation(format!("unsupported HTTP method: {}", s))),
        }
    }
}

/// Ordered header list with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set `name`, replacing any existing value whose name matches ignoring case.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(slot) => *slot = (name, value),
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let i = self.0.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.0.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fails on a name that is not a single token or a value carrying CR,
    /// LF or NUL, which would split the header block on the wire.
    pub fn validate(&self) -> Result<(), HttpError> {
        for (name, value) in self.iter() {
            if name.is_empty()
                || name
                    .chars()
                    .any(|c| c == ':' || c.is_whitespace() || c.is_control())
            {
                return Err(HttpError::Validation(format!(
                    "invalid header name {:?}",
                    name
                )));
            }
            if value.contains(['\r', '\n', '\0']) {
                return Err(HttpError::Validation(format!(
                    "invalid value for header {}: {:?}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// `defaults` with every header of `self` applied on top.
    pub fn layered_over(&self, defaults: &Headers) -> Headers {
        let mut out = defaults.clone();
        for (k, v) in self.iter() {
            out.insert(k, v);
        }
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Bytes(Vec<u8>),
    Text(String),
    Json(Value),
    /// Sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
}

impl Body {
    /// Content type implied by the body kind, if any.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Body::Bytes(_) => None,
            Body::Text(_) => Some("text/plain; charset=utf-8"),
            Body::Json(_) => Some("application/json"),
            Body::Form(_) => Some("application/x-www-form-urlencoded"),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, HttpError> {
        match self {
            Body::Bytes(b) => Ok(b.clone()),
            Body::Text(t) => Ok(t.as_bytes().to_vec()),
            Body::Json(v) => serde_json::to_vec(v)
                .map_err(|e| HttpError::Validation(format!("cannot encode JSON body: {}", e))),
            Body::Form(pairs) => Ok(url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish()
                .into_bytes()),
        }
    }

    /// Text rendering for log payloads.
    pub fn preview(&self) -> String {
        match self {
            Body::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Body::Text(t) => t.clone(),
            Body::Json(v) => v.to_string(),
            Body::Form(pairs) => url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish(),
        }
    }
}

/// A validated request, built with chained setters.
///
/// ```ignore
/// let spec = RequestSpec::new("post", "https://api.example.com/items")?
///     .header("X-Trace", "1")
///     .query("page", "2")
///     .json(serde_json::json!({"name": "widget"}))
///     .timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    url: Url,
    headers: Headers,
    query: Vec<(String, String)>,
    body: Option<Body>,
    timeout: Option<Duration>,
    default_headers: bool,
}

fn parse_url(url: &str) -> Result<Url, HttpError> {
    let parsed =
        Url::parse(url).map_err(|e| HttpError::Validation(format!("invalid URL {}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(HttpError::Validation(format!(
            "invalid URL {}: unsupported scheme {}",
            url, other
        ))),
    }
}

impl RequestSpec {
    pub fn new(method: &str, url: &str) -> Result<Self, HttpError> {
        Self::with_method(method.parse()?, url)
    }

    pub fn with_method(method: Method, url: &str) -> Result<Self, HttpError> {
        Ok(Self {
            method,
            url: parse_url(url)?,
            headers: Headers::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
            default_headers: true,
        })
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: &Headers) -> Self {
        for (k, v) in headers.iter() {
            self.headers.insert(k, v);
        }
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn body_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Some(Body::Bytes(bytes.into()));
        self
    }

    pub fn body_text(mut self, text: impl Into<String>) -> Self {
        self.body = Some(Body::Text(text.into()));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(Body::Json(value));
        self
    }

    pub fn form<K: Into<String>, V: Into<String>>(
        mut self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.body = Some(Body::Form(
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ));
        self
    }

    /// Bound on a single attempt; overrides the client's configured timeout.
    /// Values under [`MIN_TIMEOUT`] are rejected when the request is prepared.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send only the headers set on this request.
    pub fn without_default_headers(mut self) -> Self {
        self.default_headers = false;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn header_list(&self) -> &Headers {
        &self.headers
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn uses_default_headers(&self) -> bool {
        self.default_headers
    }

    /// URL with query pairs appended (percent-encoded).
    pub fn target_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        url
    }
}

//! Response record with lazily decoded text and JSON.

use std::sync::OnceLock;
use std::time::Duration;

use encoding_rs::Encoding;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::HttpError;
use crate::request::Headers;
use crate::transport::RawResponse;

/// Outcome of a successful exchange (any status).
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub content: Vec<u8>,
    /// Time spent in the attempt that produced this response.
    pub elapsed: Duration,
    pub url: String,
    /// Declared `charset`, if any.
    pub encoding: Option<String>,
    text: OnceLock<String>,
    json: OnceLock<Option<Value>>,
}

fn is_json_content_type(ct: &str) -> bool {
    let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

impl Response {
    pub fn from_raw(raw: RawResponse, elapsed: Duration) -> Self {
        let encoding = raw.encoding();
        Self {
            status: raw.status,
            headers: raw.headers,
            content: raw.body,
            elapsed,
            url: raw.url,
            encoding,
            text: OnceLock::new(),
            json: OnceLock::new(),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// Body decoded with the declared charset, or UTF-8 with replacement.
    /// Decoded once, on first access.
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| {
            let declared = self
                .encoding
                .as_deref()
                .and_then(|label| Encoding::for_label(label.as_bytes()));
            match declared {
                Some(enc) => {
                    let (text, _, had_errors) = enc.decode(&self.content);
                    if had_errors {
                        String::from_utf8_lossy(&self.content).into_owned()
                    } else {
                        text.into_owned()
                    }
                }
                None => String::from_utf8_lossy(&self.content).into_owned(),
            }
        })
    }

    /// Parsed body when the content type is JSON and the body parses.
    /// Anything else yields `None`, never an error.
    pub fn json(&self) -> Option<&Value> {
        self.json
            .get_or_init(|| {
                let ct = self.content_type()?;
                if !is_json_content_type(ct) {
                    return None;
                }
                serde_json::from_str(self.text()).ok()
            })
            .as_ref()
    }

    /// Deserialize the body as `T` regardless of content type.
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_str(self.text())
            .map_err(|e| HttpError::Validation(format!("response body is not valid JSON: {}", e)))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// `Err(Status)` unless the status is 2xx.
    pub fn raise_for_status(&self) -> Result<(), HttpError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(HttpError::Status {
                status: self.status,
                url: self.url.clone(),
            })
        }
    }

    /// Consuming form of [`raise_for_status`](Self::raise_for_status).
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        self.raise_for_status()?;
        Ok(self)
    }
}

//! `rhttp request` / `rhttp get` – send one request and print the body.

use anyhow::{anyhow, bail, Context, Result};
use rhttp_core::config::Settings;
use rhttp_core::sinks::LogSinkRegistry;
use rhttp_core::{HttpClient, RequestSpec};
use std::time::Duration;

/// Parsed request options shared by `request` and `get`.
#[derive(Debug, Clone, Default)]
pub struct RequestArgs {
    pub method: String,
    pub url: String,
    pub headers: Vec<String>,
    pub query: Vec<String>,
    pub data: Option<String>,
    pub json: Option<String>,
    pub timeout: Option<f64>,
    pub retries: Option<u32>,
    pub no_default_headers: bool,
    pub fail: bool,
    pub cooperative: bool,
}

impl RequestArgs {
    pub fn get(url: String) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            ..Self::default()
        }
    }
}

/// "Name: value" → ("Name", "value").
pub(crate) fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header must look like \"Name: value\", got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("header name is empty in {:?}", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// "name=value" → ("name", "value"). A missing '=' means an empty value.
pub(crate) fn parse_query(raw: &str) -> (String, String) {
    match raw.split_once('=') {
        Some((k, v)) => (k.to_string(), v.to_string()),
        None => (raw.to_string(), String::new()),
    }
}

pub(crate) fn build_spec(args: &RequestArgs) -> Result<RequestSpec> {
    let mut spec = RequestSpec::new(&args.method, &args.url)?;
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        spec = spec.header(name, value);
    }
    for raw in &args.query {
        let (name, value) = parse_query(raw);
        spec = spec.query(name, value);
    }
    if let Some(data) = &args.data {
        spec = spec.body_text(data.clone());
    }
    if let Some(json) = &args.json {
        let value: serde_json::Value =
            serde_json::from_str(json).context("--json is not valid JSON")?;
        spec = spec.json(value);
    }
    if let Some(secs) = args.timeout {
        let timeout = Duration::try_from_secs_f64(secs)
            .map_err(|e| anyhow!("invalid --timeout {}: {}", secs, e))?;
        spec = spec.timeout(timeout);
    }
    if args.no_default_headers {
        spec = spec.without_default_headers();
    }
    Ok(spec)
}

pub async fn run_request(
    settings: &Settings,
    registry: &LogSinkRegistry,
    args: RequestArgs,
) -> Result<()> {
    let spec = build_spec(&args)?;
    let mut http = settings.http.clone();
    if let Some(n) = args.retries {
        http.max_retries = n;
    }
    let client = HttpClient::new(http, registry)?;

    let response = if args.cooperative {
        client.request_async(spec).await?
    } else {
        let blocking = client.clone();
        tokio::task::spawn_blocking(move || blocking.request(spec)).await??
    };

    eprintln!(
        "HTTP {} {} ({:.3}s)",
        response.status,
        response.url,
        response.elapsed.as_secs_f64()
    );
    print!("{}", response.text());
    if args.fail {
        response.raise_for_status()?;
    }
    Ok(())
}

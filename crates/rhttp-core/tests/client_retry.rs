//! Integration test: client against a local scripted server.
//!
//! Covers retry on dropped connections, no retry on HTTP status, exhaustion
//! against a closed port, the cooperative path, and redaction in file logs.

mod common;

use common::scripted_server::{self, Reply};
use rhttp_core::config::{ClientConfig, LoggingConfig};
use rhttp_core::sinks::Level;
use rhttp_core::{Body, ErrorKind, HttpClient, HttpError, LogSinkRegistry, RequestSpec};
use std::fs;
use tempfile::tempdir;

fn quick_config(max_retries: u32) -> ClientConfig {
    ClientConfig {
        max_retries,
        retry_delay: 0.01,
        retry_backoff_factor: 1.0,
        timeout: 5.0,
        connect_timeout: 2.0,
        read_timeout: 5.0,
        ..ClientConfig::default()
    }
}

fn console_registry() -> LogSinkRegistry {
    LogSinkRegistry::new(LoggingConfig {
        file_path: None,
        ..LoggingConfig::default()
    })
}

#[test]
fn json_response_is_parsed() {
    let server = scripted_server::start(vec![Reply::json(200, r#"{"ok":true,"n":3}"#)]);
    let client = HttpClient::new(quick_config(0), &console_registry()).unwrap();
    let resp = client.get(&server.url).unwrap();
    assert_eq!(resp.status, 200);
    assert!(resp.is_success());
    let json = resp.json().unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["n"], 3);
    assert_eq!(server.hits(), 1);
}

#[test]
fn dropped_connections_are_retried() {
    let server = scripted_server::start(vec![
        Reply::Drop,
        Reply::Drop,
        Reply::text(200, "finally"),
    ]);
    let client = HttpClient::new(quick_config(2), &console_registry()).unwrap();
    let resp = client.get(&server.url).unwrap();
    assert_eq!(resp.text(), "finally");
    assert_eq!(server.hits(), 3);
}

#[test]
fn server_error_status_is_not_retried() {
    let server = scripted_server::start(vec![Reply::text(500, "boom"), Reply::text(200, "ok")]);
    let client = HttpClient::new(quick_config(3), &console_registry()).unwrap();
    let resp = client.get(&server.url).unwrap();
    assert_eq!(resp.status, 500);
    assert!(resp.is_server_error());
    assert_eq!(server.hits(), 1);
    match resp.raise_for_status().unwrap_err() {
        HttpError::Status { status, url } => {
            assert_eq!(status, 500);
            assert_eq!(url, server.url);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn refused_connection_exhausts_retries() {
    let url = scripted_server::refused_url();
    let client = HttpClient::new(quick_config(2), &console_registry()).unwrap();
    let err = client.get(&url).unwrap_err();
    assert!(err.is_retry_exhausted(), "got {err:?}");
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().contains("maximum retry attempts (2) exceeded"));

    let single = HttpClient::new(quick_config(0), &console_registry()).unwrap();
    let err = single.get(&url).unwrap_err();
    assert!(matches!(err, HttpError::Connection(_)), "got {err:?}");
}

#[test]
fn post_sends_json_body_and_query() {
    let server = scripted_server::start(vec![Reply::json(201, "{}")]);
    let client = HttpClient::new(quick_config(0), &console_registry()).unwrap();
    let spec = RequestSpec::new("POST", &server.url)
        .unwrap()
        .query("dry_run", "true")
        .header("X-Trace", "abc")
        .json(serde_json::json!({"name": "widget"}));
    let resp = client.request(spec).unwrap();
    assert_eq!(resp.status, 201);

    let received = server.received();
    assert_eq!(received.len(), 1);
    let req = &received[0];
    assert!(req.request_line().starts_with("POST /?dry_run=true "), "{}", req.request_line());
    assert_eq!(req.header("content-type"), Some("application/json"));
    assert_eq!(req.header("x-trace"), Some("abc"));
    assert!(req.header("user-agent").unwrap().starts_with("rhttp/"));
    assert_eq!(req.body, br#"{"name":"widget"}"#);
}

#[test]
fn without_default_headers_omits_user_agent() {
    let server = scripted_server::start(vec![Reply::text(200, "ok")]);
    let client = HttpClient::new(quick_config(0), &console_registry()).unwrap();
    let spec = RequestSpec::new("GET", &server.url)
        .unwrap()
        .without_default_headers();
    client.request(spec).unwrap();
    let req = &server.received()[0];
    assert_ne!(
        req.header("user-agent").map(|ua| ua.starts_with("rhttp/")),
        Some(true)
    );
}

#[tokio::test]
async fn async_requests_retry_without_blocking() {
    let server = scripted_server::start(vec![Reply::Drop, Reply::json(200, r#"{"a":1}"#)]);
    let client = HttpClient::new(quick_config(1), &console_registry()).unwrap();
    let resp = client.get_async(&server.url).await.unwrap();
    assert_eq!(resp.json().unwrap()["a"], 1);
    assert_eq!(server.hits(), 2);

    let put = client
        .put_async(&server.url, Body::Text("payload".into()))
        .await
        .unwrap();
    assert_eq!(put.status, 200);
}

#[test]
fn file_log_redacts_sensitive_headers() {
    let server = scripted_server::start(vec![Reply::Drop, Reply::json(200, "{}")]);
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("http.log");
    let cfg = ClientConfig {
        log_level: Level::Debug,
        log_file_path: Some(log_path.clone()),
        ..quick_config(1)
    };
    let registry = console_registry();
    let client = HttpClient::new(cfg, &registry).unwrap();
    let spec = RequestSpec::new("GET", &server.url)
        .unwrap()
        .header("Authorization", "Bearer top-secret")
        .header("x-api-key", "k-123");
    client.request(spec).unwrap();
    client.logger().entry().flush();

    // The server still sees the real credentials.
    assert_eq!(
        server.received()[0].header("authorization"),
        Some("Bearer top-secret")
    );

    let log = fs::read_to_string(&log_path).unwrap();
    assert!(!log.contains("top-secret"), "{log}");
    assert!(!log.contains("k-123"), "{log}");
    assert!(log.contains("***REDACTED***"));
    assert!(log.contains(&format!("Request: GET {}", server.url)));
    assert!(log.contains(&format!("Retry 1/1 for {}", server.url)));
    assert!(log.contains(&format!("Response: 200 {}", server.url)));
    assert!(log.contains(" - http_client - "));
}

#[test]
fn clients_sharing_a_log_file_keep_one_handler() {
    let server = scripted_server::start(vec![Reply::text(200, "ok")]);
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("shared.log");
    let registry = console_registry();
    let cfg = ClientConfig {
        log_file_path: Some(log_path.clone()),
        ..quick_config(0)
    };
    let a = HttpClient::new(cfg.clone(), &registry).unwrap();
    let b = HttpClient::new(cfg.clone(), &registry).unwrap();
    assert_eq!(a.logger().entry().file_handler_count(), 1);

    let resized = ClientConfig {
        log_file_rotation_enabled: true,
        log_file_max_size: 4096,
        ..cfg
    };
    let c = HttpClient::new(resized, &registry).unwrap();
    assert_eq!(c.logger().entry().file_handler_count(), 1);

    a.get(&server.url).unwrap();
    b.get(&server.url).unwrap();
    c.get(&server.url).unwrap();
    c.logger().entry().flush();
    let log = fs::read_to_string(&log_path).unwrap();
    assert_eq!(log.matches("Response: 200").count(), 3);
}

//! Unhandled handler errors are logged with the request that caused them

use super::{send, test_router};
use axum::body::Body;
use axum::http::{header, Request};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use tests::{LogEntry, LogLevel, TestLogger};

fn unhandled(entries: &[LogEntry]) -> Vec<&LogEntry> {
    entries
        .iter()
        .filter(|e| e.message == "Unhandled request error")
        .collect()
}

#[tokio::test]
async fn test_error_entry_describes_the_request() {
    let harness = TestLogger::new(LogLevel::Debug).await;
    let router = test_router(&harness);

    let body = r#"{"name":"lamp","password":"hunter2"}"#;
    let request = Request::post("/items/42?dryRun=true&source=import")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .header("x-forwarded-for", "198.51.100.7")
        .body(Body::from(body))
        .unwrap();
    let response = send(&router, request).await;

    // Response goes out unchanged
    assert_eq!(response.status(), 500);
    let sent = response.into_body().collect().await.unwrap().to_bytes();
    let sent: serde_json::Value = serde_json::from_slice(&sent).unwrap();
    assert_eq!(sent, json!({"error": "Internal Server Error"}));

    let entries = harness.entries().await;
    let errors = unhandled(&entries);
    assert_eq!(errors.len(), 1);

    let entry = errors[0];
    assert_eq!(entry.level, LogLevel::Error);
    assert_eq!(entry.context.as_deref(), Some("HTTP"));
    assert_eq!(entry.error.as_ref().unwrap().message, "item 42 could not be saved");
    assert_eq!(
        entry.metadata.as_ref().unwrap(),
        json!({
            "method": "POST",
            "path": "/items/42",
            "ip": "198.51.100.7",
            "body": {"name": "lamp", "password": "[REDACTED]"},
            "query": {"dryRun": "true", "source": "import"},
            "params": {"id": "42"},
        })
        .as_object()
        .unwrap()
    );

    // Correlated with the request's start and finish entries
    let start = entries.iter().find(|e| e.message == "Incoming request").unwrap();
    assert_eq!(entry.request_id, start.request_id);
}

#[tokio::test]
async fn test_client_error_is_logged_and_passed_through() {
    let harness = TestLogger::new(LogLevel::Debug).await;
    let router = test_router(&harness);

    let response = send(&router, super::get_request("/missing")).await;
    assert_eq!(response.status(), 404);

    let sent = response.into_body().collect().await.unwrap().to_bytes();
    let sent: serde_json::Value = serde_json::from_slice(&sent).unwrap();
    assert_eq!(sent, json!({"error": "no such item"}));

    let entries = harness.entries().await;
    let errors = unhandled(&entries);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].metadata.as_ref().unwrap()["body"], json!(null));
}

#[tokio::test]
async fn test_multipart_body_is_not_captured() {
    let harness = TestLogger::new(LogLevel::Debug).await;
    let router = test_router(&harness);

    let body = "--x\r\nContent-Disposition: form-data; name=\"file\"\r\n\r\nabc\r\n--x--\r\n";
    let request = Request::post("/items/7")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();
    send(&router, request).await;

    let entries = harness.entries().await;
    let errors = unhandled(&entries);
    assert_eq!(
        errors[0].metadata.as_ref().unwrap()["body"],
        json!(format!("[{} bytes]", body.len()))
    );
}

#[tokio::test]
async fn test_successful_requests_log_no_error() {
    let harness = TestLogger::new(LogLevel::Debug).await;
    let router = test_router(&harness);

    send(&router, super::get_request("/ok")).await;
    send(&router, super::get_request("/health")).await;

    let entries = harness.entries().await;
    assert!(unhandled(&entries).is_empty());
    assert_eq!(entries.len(), 4);
}

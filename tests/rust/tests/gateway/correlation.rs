//! Request ids, start/finish entries and status-to-level mapping

use super::{get_request, send, test_router};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use tests::{LogEntry, LogLevel, TestLogger};
use tidelog_gateway::X_REQUEST_ID;

fn meta<'a>(entry: &'a LogEntry, key: &str) -> &'a serde_json::Value {
    &entry.metadata.as_ref().unwrap()[key]
}

#[tokio::test]
async fn test_start_and_finish_share_request_id() {
    let harness = TestLogger::new(LogLevel::Debug).await;
    let router = test_router(&harness);

    let response = send(&router, get_request("/ok")).await;
    assert_eq!(response.status(), 200);

    let header_id = response.headers()[X_REQUEST_ID].to_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&header_id).is_ok());

    let entries = harness.entries().await;
    assert_eq!(entries.len(), 2);

    let (start, finish) = (&entries[0], &entries[1]);
    assert_eq!(start.message, "Incoming request");
    assert_eq!(start.level, LogLevel::Info);
    assert_eq!(start.context.as_deref(), Some("HTTP"));
    assert_eq!(meta(start, "method"), &json!("GET"));
    assert_eq!(meta(start, "path"), &json!("/ok"));
    assert_eq!(meta(start, "ip"), &json!("unknown"));

    assert_eq!(finish.message, "Request completed");
    assert_eq!(meta(finish, "statusCode"), &json!(200));
    assert!(meta(finish, "durationMs").is_u64());

    assert_eq!(start.request_id.as_deref(), Some(header_id.as_str()));
    assert_eq!(finish.request_id.as_deref(), Some(header_id.as_str()));
}

#[tokio::test]
async fn test_handler_entries_carry_the_request_id() {
    let harness = TestLogger::new(LogLevel::Debug).await;
    let router = test_router(&harness);

    let response = send(&router, get_request("/work")).await;
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let returned_id = String::from_utf8(body.to_vec()).unwrap();

    let entries = harness.entries().await;
    let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["Incoming request", "Doing work", "Request completed"]);
    assert!(entries
        .iter()
        .all(|e| e.request_id.as_deref() == Some(returned_id.as_str())));
}

#[tokio::test]
async fn test_finish_level_follows_status() {
    let harness = TestLogger::new(LogLevel::Debug).await;
    let router = test_router(&harness);

    send(&router, get_request("/ok")).await;
    send(&router, get_request("/missing")).await;
    send(&router, get_request("/nowhere")).await;

    let finishes: Vec<(u64, LogLevel)> = harness
        .entries()
        .await
        .iter()
        .filter(|e| e.message == "Request completed")
        .map(|e| (meta(e, "statusCode").as_u64().unwrap(), e.level))
        .collect();

    assert_eq!(
        finishes,
        vec![
            (200, LogLevel::Info),
            (404, LogLevel::Warn),
            (404, LogLevel::Warn),
        ]
    );
}

#[tokio::test]
async fn test_server_error_finishes_at_error_level() {
    let harness = TestLogger::new(LogLevel::Debug).await;
    let router = test_router(&harness);

    let request = axum::http::Request::post("/items/42")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), 500);

    let entries = harness.entries().await;
    let finish = entries
        .iter()
        .find(|e| e.message == "Request completed")
        .unwrap();
    assert_eq!(finish.level, LogLevel::Error);
    assert_eq!(meta(finish, "statusCode"), &json!(500));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_get_distinct_ids() {
    let harness = TestLogger::new(LogLevel::Debug).await;
    let router = test_router(&harness);

    let mut tasks = Vec::new();
    for _ in 0..25 {
        let router = router.clone();
        tasks.push(tokio::spawn(async move {
            send(&router, super::get_request("/work")).await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().status(), 200);
    }

    let mut by_id: HashMap<String, Vec<String>> = HashMap::new();
    for entry in harness.entries().await {
        by_id
            .entry(entry.request_id.clone().unwrap())
            .or_default()
            .push(entry.message);
    }

    assert_eq!(by_id.len(), 25);
    for messages in by_id.values() {
        assert_eq!(
            messages,
            &vec!["Incoming request", "Doing work", "Request completed"]
        );
    }
}

#[tokio::test]
async fn test_threshold_above_info_hides_successes() {
    let harness = TestLogger::new(LogLevel::Warn).await;
    let router = test_router(&harness);

    send(&router, get_request("/ok")).await;
    send(&router, get_request("/missing")).await;

    // The 404 finish entry, plus the handler error it carried
    let entries = harness.entries().await;
    let summary: Vec<(&str, LogLevel)> = entries
        .iter()
        .map(|e| (e.message.as_str(), e.level))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Unhandled request error", LogLevel::Error),
            ("Request completed", LogLevel::Warn),
        ]
    );
    assert!(entries.iter().all(|e| meta(e, "path") == &json!("/missing")));
}

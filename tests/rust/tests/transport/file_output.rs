//! What reaches the log file, and in which shape

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tests::{read_entries, LogLevel, TestLogger};
use tidelog_core::{ErrorInfo, LogOptions};

#[tokio::test]
async fn test_json_lines_follow_entry_schema() {
    let harness = TestLogger::new(LogLevel::Debug).await;

    harness.logger.info_with(
        "Upload stored",
        LogOptions::new()
            .with_context("Storage")
            .with_request_id("req-1")
            .with_user_id("user-9")
            .with_field("bytes", 2048)
            .with_field("bucket", "media"),
    );
    harness.logger.flush().await;

    let raw = std::fs::read_to_string(harness.active_path()).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 1);

    let value: Value = serde_json::from_str(lines[0]).unwrap();
    let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["timestamp", "level", "message", "context", "metadata", "requestId", "userId"]
    );
    assert_eq!(value["level"], json!("info"));
    assert_eq!(value["metadata"], json!({"bytes": 2048, "bucket": "media"}));

    // ISO 8601 UTC
    let ts = value["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    assert!(ts.ends_with('Z'));
}

#[tokio::test]
async fn test_threshold_filters_file_output() {
    let harness = TestLogger::new(LogLevel::Warn).await;

    harness.logger.debug("cache miss");
    harness.logger.info("request served");
    harness.logger.warn("slow response");
    harness.logger.error("upstream timeout");

    let levels: Vec<LogLevel> = harness.entries().await.iter().map(|e| e.level).collect();
    assert_eq!(levels, vec![LogLevel::Warn, LogLevel::Error]);
}

#[tokio::test]
async fn test_error_details_are_kept() {
    let harness = TestLogger::new(LogLevel::Info).await;

    let error = anyhow::anyhow!("connection reset").context("Failed to fetch manifest");
    harness.logger.error_with(
        "Sync aborted",
        LogOptions::new().with_error(ErrorInfo::from_anyhow(&error)),
    );

    let entries = harness.entries().await;
    let info = entries[0].error.as_ref().unwrap();
    assert_eq!(info.message, "Failed to fetch manifest");
    assert!(info.stack.as_deref().unwrap().contains("Caused by: connection reset"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_never_interleave() {
    let harness = TestLogger::new(LogLevel::Debug).await;

    let mut tasks = Vec::new();
    for worker in 0..8 {
        let logger = harness.logger.clone();
        tasks.push(tokio::spawn(async move {
            for n in 0..50 {
                logger.info_with(
                    format!("worker {} entry {}", worker, n),
                    LogOptions::new().with_field("worker", worker),
                );
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Every line parses as a whole entry
    let entries = harness.entries().await;
    assert_eq!(entries.len(), 400);

    // Per-worker order is preserved
    for worker in 0..8 {
        let ours: Vec<String> = entries
            .iter()
            .filter(|e| e.metadata.as_ref().unwrap()["worker"] == json!(worker))
            .map(|e| e.message.clone())
            .collect();
        let expected: Vec<String> = (0..50)
            .map(|n| format!("worker {} entry {}", worker, n))
            .collect();
        assert_eq!(ours, expected);
    }
}

#[tokio::test]
async fn test_entries_after_close_are_dropped() {
    let harness = TestLogger::new(LogLevel::Debug).await;

    harness.logger.info("before close");
    harness.logger.close().await;
    harness.logger.info("after close");

    let entries = read_entries(&harness.active_path());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "before close");
}

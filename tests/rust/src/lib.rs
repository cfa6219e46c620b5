//! Shared test utilities and fixtures for Tidelog integration tests.

pub use tidelog_core::{LogEntry, LogFormat, LogLevel, Logger, LoggingConfig};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tidelog_core::ConsoleTransport;

/// A JSON-format, file-only logger writing into its own temporary directory
pub struct TestLogger {
    pub logger: Arc<Logger>,
    pub dir: TempDir,
}

impl TestLogger {
    pub async fn new(level: LogLevel) -> Self {
        Self::with_limits(level, 10 * 1024 * 1024, 5).await
    }

    pub async fn with_limits(level: LogLevel, max_file_size: u64, max_files: usize) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let config = Arc::new(json_file_config(dir.path(), level, max_file_size, max_files));
        let logger = Logger::with_console(config, ConsoleTransport::new(false)).await;

        Self {
            logger: Arc::new(logger),
            dir,
        }
    }

    pub fn active_path(&self) -> PathBuf {
        self.dir.path().join("app.log")
    }

    pub fn archive_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("app.log.{}", index))
    }

    /// Flush pending writes and parse the active file
    pub async fn entries(&self) -> Vec<LogEntry> {
        self.logger.flush().await;
        read_entries(&self.active_path())
    }
}

pub fn json_file_config(
    dir: &Path,
    level: LogLevel,
    max_file_size: u64,
    max_files: usize,
) -> LoggingConfig {
    LoggingConfig {
        level,
        enable_console: false,
        enable_file_transport: true,
        log_dir: dir.to_path_buf(),
        log_file_name: "app.log".to_string(),
        max_file_size,
        max_files,
        format: LogFormat::Json,
    }
}

/// Parse every line of a JSON log file; a missing file reads as empty
pub fn read_entries(path: &Path) -> Vec<LogEntry> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => panic!("failed to read {}: {}", path.display(), e),
    };

    content
        .lines()
        .map(|line| serde_json::from_str(line).expect("log line is a JSON entry"))
        .collect()
}

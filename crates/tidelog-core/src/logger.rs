//! Logger facade - severity gate in front of the console and file transports

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::domain::{ErrorInfo, LogEntry, LogLevel, LogOptions, LoggingConfig};
use crate::transport::{ConsoleTransport, FileTransport, FileWriterHandle};

/// Process logger.
///
/// Construct one at startup and hand it (as `Arc<Logger>`) to every
/// component that logs. Log calls never fail and never block on disk.
pub struct Logger {
    config: Arc<LoggingConfig>,
    console: Option<ConsoleTransport>,
    file: Option<FileWriterHandle>,
    closed: AtomicBool,
}

impl Logger {
    /// Create a logger; colors follow whether stdout is a terminal
    pub async fn new(config: Arc<LoggingConfig>) -> Self {
        Self::with_console(config, ConsoleTransport::detect()).await
    }

    /// Create a logger with an explicit console transport.
    ///
    /// If the file transport is enabled but the active file cannot be opened,
    /// the logger reports it once and runs console-only.
    pub async fn with_console(config: Arc<LoggingConfig>, console: ConsoleTransport) -> Self {
        let file = if config.enable_file_transport {
            match FileTransport::open(&config).await {
                Ok(transport) => Some(FileWriterHandle::spawn(transport, console)),
                Err(e) => {
                    console.report(&LogEntry::with_options(
                        LogLevel::Error,
                        "File logging unavailable, continuing on console only",
                        LogOptions::new()
                            .with_context("Logger")
                            .with_error(ErrorInfo::from_error(&e)),
                    ));
                    None
                }
            }
        } else {
            None
        };

        Self {
            console: config.enable_console.then_some(console),
            file,
            closed: AtomicBool::new(false),
            config,
        }
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// Whether an entry at `level` passes the threshold
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.config.level
    }

    /// Whether entries currently reach the log file
    pub fn file_active(&self) -> bool {
        self.file.as_ref().is_some_and(|file| !file.is_degraded()) && !self.is_closed()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Build and dispatch an entry if `level` passes the threshold
    pub fn log(&self, level: LogLevel, message: impl Into<String>, options: LogOptions) {
        if !self.is_enabled(level) || self.is_closed() {
            return;
        }

        let entry = LogEntry::with_options(level, message, options);

        if let Some(console) = &self.console {
            console.write(&entry);
        }
        if let Some(file) = &self.file {
            file.send(entry);
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message, LogOptions::default());
    }

    pub fn debug_with(&self, message: impl Into<String>, options: LogOptions) {
        self.log(LogLevel::Debug, message, options);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, LogOptions::default());
    }

    pub fn info_with(&self, message: impl Into<String>, options: LogOptions) {
        self.log(LogLevel::Info, message, options);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message, LogOptions::default());
    }

    pub fn warn_with(&self, message: impl Into<String>, options: LogOptions) {
        self.log(LogLevel::Warn, message, options);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, LogOptions::default());
    }

    pub fn error_with(&self, message: impl Into<String>, options: LogOptions) {
        self.log(LogLevel::Error, message, options);
    }

    /// Wait until every accepted entry has been written
    pub async fn flush(&self) {
        if let Some(file) = &self.file {
            file.flush().await;
        }
    }

    /// Release the log file. Entries logged afterwards are dropped.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(file) = &self.file {
            file.close().await;
        }
    }

    /// Blocking variant of [`Logger::close`] for the panic hook
    pub fn close_blocking(&self, timeout: Duration) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(file) = &self.file {
            file.close_blocking(timeout);
        }
    }
}

static GLOBAL: OnceLock<Arc<Logger>> = OnceLock::new();

/// Register the process-wide default logger (bootstrap code only).
///
/// Returns false if one was already installed.
pub fn install_global(logger: Arc<Logger>) -> bool {
    GLOBAL.set(logger).is_ok()
}

/// The default logger, if bootstrap installed one
pub fn global() -> Option<Arc<Logger>> {
    GLOBAL.get().cloned()
}

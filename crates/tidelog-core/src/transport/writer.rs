//! File writer task - serializes every file operation through one task

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use super::{ConsoleTransport, FileTransport};
use crate::domain::{ErrorInfo, LogEntry, LogLevel, LogOptions};
use crate::error::LoggingError;

/// Sink for the writer's own failure reports
pub type Reporter = Box<dyn Fn(&LogEntry) + Send + Sync>;

enum Command {
    Write(Box<LogEntry>),
    Flush(oneshot::Sender<()>),
    Close(CloseAck),
}

enum CloseAck {
    Async(oneshot::Sender<()>),
    Blocking(std::sync::mpsc::SyncSender<()>),
}

impl CloseAck {
    fn send(self) {
        match self {
            Self::Async(tx) => {
                let _ = tx.send(());
            }
            Self::Blocking(tx) => {
                let _ = tx.send(());
            }
        }
    }
}

/// Handle to the writer task owning the [`FileTransport`].
///
/// Sending never blocks; entries queue in an unbounded channel and are
/// written in order. Rotation decisions happen on the same task, so writes
/// never interleave with a rotation.
#[derive(Clone)]
pub struct FileWriterHandle {
    tx: mpsc::UnboundedSender<Command>,
    degraded: Arc<AtomicBool>,
}

impl FileWriterHandle {
    /// Spawn the writer task on the current tokio runtime.
    ///
    /// `console` receives the one-time failure reports on stderr.
    pub fn spawn(transport: FileTransport, console: ConsoleTransport) -> Self {
        Self::spawn_with_reporter(
            transport,
            Box::new(move |entry: &LogEntry| console.report(entry)),
        )
    }

    pub fn spawn_with_reporter(transport: FileTransport, reporter: Reporter) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let degraded = Arc::new(AtomicBool::new(false));

        let writer = FileWriter {
            transport,
            reporter,
            degraded: degraded.clone(),
            rotation_failing: false,
        };
        tokio::spawn(writer.run(rx));

        Self { tx, degraded }
    }

    /// Queue an entry. Returns false when the entry was dropped.
    pub fn send(&self, entry: LogEntry) -> bool {
        if self.is_degraded() {
            return false;
        }
        self.tx.send(Command::Write(Box::new(entry))).is_ok()
    }

    /// True once a write failure has disabled the file transport
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Wait until every entry queued so far has been handled
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Flush, release the file handle and stop the task
    pub async fn close(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Close(CloseAck::Async(ack))).is_ok() {
            let _ = done.await;
        }
    }

    /// Synchronous close for contexts that cannot await (panic hook).
    ///
    /// Returns false if the task did not confirm within `timeout`.
    pub fn close_blocking(&self, timeout: Duration) -> bool {
        let (ack, done) = std::sync::mpsc::sync_channel(1);
        if self.tx.send(Command::Close(CloseAck::Blocking(ack))).is_err() {
            return true;
        }
        done.recv_timeout(timeout).is_ok()
    }
}

struct FileWriter {
    transport: FileTransport,
    reporter: Reporter,
    degraded: Arc<AtomicBool>,
    rotation_failing: bool,
}

impl FileWriter {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Write(entry) => self.write(&entry).await,
                Command::Flush(ack) => {
                    let _ = ack.send(());
                }
                Command::Close(ack) => {
                    if let Err(e) = self.transport.close().await {
                        self.report(LogLevel::Error, "Failed to flush log file on close", &e);
                    }
                    ack.send();
                    break;
                }
            }
        }
    }

    async fn write(&mut self, entry: &LogEntry) {
        if self.degraded.load(Ordering::Acquire) {
            return;
        }

        match self.transport.rotate_if_needed().await {
            Ok(rotated) => {
                if rotated {
                    self.rotation_failing = false;
                }
            }
            Err(e @ LoggingError::Rotation { .. }) => {
                // One report per failure streak; the next oversized write retries
                if !self.rotation_failing {
                    self.rotation_failing = true;
                    self.report(LogLevel::Warn, "Log rotation failed, will retry", &e);
                }
            }
            Err(e) => {
                self.degrade(&e).await;
                return;
            }
        }

        match self.transport.append(entry).await {
            Ok(()) => {}
            Err(e @ LoggingError::Serialize(_)) => {
                self.report(LogLevel::Warn, "Dropped log entry that could not be serialized", &e);
            }
            Err(e) => self.degrade(&e).await,
        }
    }

    async fn degrade(&mut self, err: &LoggingError) {
        self.degraded.store(true, Ordering::Release);
        let _ = self.transport.close().await;
        self.report(
            LogLevel::Error,
            "File logging disabled after write failure, continuing on console only",
            err,
        );
    }

    fn report(&self, level: LogLevel, message: &str, err: &LoggingError) {
        let entry = LogEntry::with_options(
            level,
            message,
            LogOptions::new()
                .with_context("Logger")
                .with_error(ErrorInfo::from_error(err)),
        );
        (self.reporter)(&entry);
    }
}

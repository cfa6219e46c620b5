//! Process lifecycle: shutdown signals, the panic hook and logged background tasks

use std::any::Any;
use std::future::Future;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;
use tidelog_core::{ErrorInfo, LogOptions, Logger};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::JoinHandle;

/// Context label for process-level entries
pub const PROCESS_CONTEXT: &str = "Process";

/// Upper bound on waiting for the log file to flush before exiting
const EXIT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

/// Log any panic at `error`, flush the logger and exit with status 1
pub fn install_panic_hook(logger: Arc<Logger>) {
    std::panic::set_hook(Box::new(move |info| {
        let error = describe_panic(info.payload(), info.location());
        logger.error_with(
            "Uncaught panic, shutting down",
            LogOptions::new()
                .with_context(PROCESS_CONTEXT)
                .with_error(error),
        );
        close_for_exit(&logger);
        std::process::exit(1);
    }));
}

fn close_for_exit(logger: &Logger) {
    match Handle::try_current() {
        // Let the runtime keep driving the writer while this thread waits
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| logger.close_blocking(EXIT_FLUSH_TIMEOUT))
        }
        _ => logger.close_blocking(EXIT_FLUSH_TIMEOUT),
    }
}

/// Turn a panic payload into the entry's error details
pub fn describe_panic(payload: &(dyn Any + Send), location: Option<&Location<'_>>) -> ErrorInfo {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    };

    let mut stack = match location {
        Some(loc) => format!("at {}:{}:{}", loc.file(), loc.line(), loc.column()),
        None => String::new(),
    };

    let backtrace = std::backtrace::Backtrace::capture();
    if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
        if !stack.is_empty() {
            stack.push('\n');
        }
        stack.push_str(&backtrace.to_string());
    }

    let info = ErrorInfo::new("Panic", message);
    if stack.is_empty() {
        info
    } else {
        info.with_stack(stack)
    }
}

/// Spawn a background task whose failure is logged instead of lost.
///
/// An `Err` is logged at `error` with the task name; the process keeps running.
pub fn spawn_logged<F>(logger: Arc<Logger>, name: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = task.await {
            logger.error_with(
                format!("Background task '{}' failed", name),
                LogOptions::new()
                    .with_context(PROCESS_CONTEXT)
                    .with_error(ErrorInfo::from_anyhow(&e))
                    .with_field("task", name),
            );
        }
    })
}

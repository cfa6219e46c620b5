//! Console transport - colored lines on stdout/stderr

use std::io::{IsTerminal, Write};

use super::format::{render_details, render_header};
use crate::domain::LogEntry;

/// Writes entries to the standard streams.
///
/// Warnings and errors go to stderr with their error, stack and metadata on
/// extra lines; everything else is a single line on stdout.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleTransport {
    stdout_ansi: bool,
    stderr_ansi: bool,
}

impl ConsoleTransport {
    /// Same color setting on both streams
    pub fn new(ansi: bool) -> Self {
        Self::with_streams(ansi, ansi)
    }

    pub fn with_streams(stdout_ansi: bool, stderr_ansi: bool) -> Self {
        Self {
            stdout_ansi,
            stderr_ansi,
        }
    }

    /// Colors on for each stream that is a terminal
    pub fn detect() -> Self {
        Self::with_streams(
            std::io::stdout().is_terminal(),
            std::io::stderr().is_terminal(),
        )
    }

    /// Render an entry exactly as `write` would print it
    pub fn format(&self, entry: &LogEntry) -> String {
        let ansi = if entry.level.is_diagnostic() {
            self.stderr_ansi
        } else {
            self.stdout_ansi
        };
        let mut out = render_header(entry, ansi);
        out.push('\n');
        if entry.level.is_diagnostic() {
            out.push_str(&render_details(entry));
        }
        out
    }

    pub fn write(&self, entry: &LogEntry) {
        let text = self.format(entry);
        // Console output is best effort; a closed pipe must not take the process down
        if entry.level.is_diagnostic() {
            let _ = std::io::stderr().lock().write_all(text.as_bytes());
        } else {
            let _ = std::io::stdout().lock().write_all(text.as_bytes());
        }
    }

    /// Internal diagnostics from the logger itself, always on stderr
    pub fn report(&self, entry: &LogEntry) {
        let mut text = render_header(entry, self.stderr_ansi);
        text.push('\n');
        text.push_str(&render_details(entry));
        let _ = std::io::stderr().lock().write_all(text.as_bytes());
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::detect()
    }
}

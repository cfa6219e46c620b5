//! Text rendering shared by the console and file transports

use chrono::SecondsFormat;
use nu_ansi_term::{Color, Style};
use std::fmt::Write;

use crate::domain::{LogEntry, LogLevel};

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Debug => Color::Cyan,
        LogLevel::Info => Color::Green,
        LogLevel::Warn => Color::Yellow,
        LogLevel::Error => Color::Red,
    }
}

/// `[timestamp] [LEVEL] [requestId] [context] message`
pub fn render_header(entry: &LogEntry, ansi: bool) -> String {
    let timestamp = entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
    let level = entry.level.label();

    let mut line = if ansi {
        format!(
            "{} {}",
            Style::new().dimmed().paint(format!("[{}]", timestamp)),
            level_color(entry.level).bold().paint(format!("[{}]", level))
        )
    } else {
        format!("[{}] [{}]", timestamp, level)
    };

    if let Some(request_id) = &entry.request_id {
        if ansi {
            let _ = write!(line, " {}", Color::Purple.paint(format!("[{}]", request_id)));
        } else {
            let _ = write!(line, " [{}]", request_id);
        }
    }

    if let Some(context) = &entry.context {
        if ansi {
            let _ = write!(line, " {}", Color::Blue.paint(format!("[{}]", context)));
        } else {
            let _ = write!(line, " [{}]", context);
        }
    }

    let _ = write!(line, " {}", entry.message);
    line
}

/// Indented sub-lines for user, error, stack and metadata.
///
/// Each line ends with a newline; empty when the entry carries none of them.
pub fn render_details(entry: &LogEntry) -> String {
    let mut out = String::new();

    if let Some(user_id) = &entry.user_id {
        let _ = writeln!(out, "  User: {}", user_id);
    }

    if let Some(error) = &entry.error {
        let _ = writeln!(out, "  Error: {}: {}", error.name, error.message);
        if let Some(stack) = &error.stack {
            let mut lines = stack.lines();
            if let Some(first) = lines.next() {
                let _ = writeln!(out, "  Stack: {}", first);
            }
            for line in lines {
                let _ = writeln!(out, "         {}", line);
            }
        }
    }

    if let Some(metadata) = &entry.metadata {
        if !metadata.is_empty() {
            let rendered = serde_json::to_string(metadata).unwrap_or_else(|_| "{}".to_string());
            let _ = writeln!(out, "  Metadata: {}", rendered);
        }
    }

    out
}

/// Full human-readable block: header plus every detail line, newline terminated
pub fn render_block(entry: &LogEntry) -> String {
    let mut block = render_header(entry, false);
    block.push('\n');
    block.push_str(&render_details(entry));
    block
}

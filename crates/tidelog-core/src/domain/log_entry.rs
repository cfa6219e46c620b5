//! Log entry types carried through the logging pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Ordered key/value metadata attached to an entry
pub type Metadata = serde_json::Map<String, Value>;

/// A single log entry (stored as JSON Lines in `json` format)
///
/// Created once per log call and never mutated after dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Timestamp (ISO 8601, UTC)
    pub timestamp: DateTime<Utc>,

    /// Severity
    pub level: LogLevel,

    /// Message
    pub message: String,

    /// Subsystem the entry came from (e.g. "HTTP")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Error attached to the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,

    /// Optional metadata (JSON object, insertion ordered)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    /// Correlation id of the request that produced the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl LogEntry {
    /// Create a new log entry stamped with the current time
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            context: None,
            error: None,
            metadata: None,
            request_id: None,
            user_id: None,
        }
    }

    /// Create a new log entry carrying every field set on `options`
    pub fn with_options(level: LogLevel, message: impl Into<String>, options: LogOptions) -> Self {
        let LogOptions {
            context,
            error,
            metadata,
            request_id,
            user_id,
        } = options;

        Self {
            context,
            error,
            metadata,
            request_id,
            user_id,
            ..Self::new(level, message)
        }
    }

    /// Add metadata to the log entry
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the context label
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Log level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [Self::Debug, Self::Info, Self::Warn, Self::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Uppercase label used by the text formats
    pub fn label(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Errors and warnings go to stderr
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Warn | Self::Error)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown log level: {}", s))
    }
}

/// Error details attached to an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorInfo {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Capture any error; the stack is its `source()` chain
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(format!("Caused by: {}", cause));
            source = cause.source();
        }

        let info = Self::new(short_type_name::<E>(), err.to_string());
        if chain.is_empty() {
            info
        } else {
            info.with_stack(chain.join("\n"))
        }
    }

    /// Capture an `anyhow::Error` with its context chain and backtrace
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let mut lines: Vec<String> = err
            .chain()
            .skip(1)
            .map(|cause| format!("Caused by: {}", cause))
            .collect();

        let backtrace = err.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            lines.push(backtrace.to_string());
        }

        let info = Self::new("Error", err.to_string());
        if lines.is_empty() {
            info
        } else {
            info.with_stack(lines.join("\n"))
        }
    }
}

impl From<&anyhow::Error> for ErrorInfo {
    fn from(err: &anyhow::Error) -> Self {
        Self::from_anyhow(err)
    }
}

/// Last path segment of a type name, without generic arguments
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Optional fields accepted by every log call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogOptions {
    pub context: Option<String>,
    pub error: Option<ErrorInfo>,
    pub metadata: Option<Metadata>,
    pub request_id: Option<String>,
    pub user_id: Option<String>,
}

impl LogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Append one metadata field, keeping insertion order
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

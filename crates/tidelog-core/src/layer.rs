//! Tracing bridge - forwards `tracing` events into the [`Logger`].
//!
//! Lets the host and its libraries keep using `tracing` macros while every
//! event still goes through the logger's threshold and transports.

use std::fmt::Write as FmtWrite;
use std::sync::Arc;

use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::domain::{ErrorInfo, LogLevel, LogOptions, Metadata};
use crate::logger::Logger;

/// Fields lifted out of the metadata into the entry's request id
const REQUEST_ID_FIELDS: &[&str] = &["request_id", "requestId", "trace_id"];

/// A tracing Layer that hands events to a [`Logger`]
pub struct LoggerLayer {
    logger: Arc<Logger>,
}

impl LoggerLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }
}

fn map_level(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::INFO => LogLevel::Info,
        _ => LogLevel::Debug,
    }
}

impl<S> Layer<S> for LoggerLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = map_level(metadata.level());
        if !self.logger.is_enabled(level) {
            return;
        }

        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);

        let mut options = LogOptions::new().with_context(metadata.target());
        if let Some(request_id) = visitor.request_id {
            options = options.with_request_id(request_id);
        }
        if let Some(error) = visitor.error {
            options = options.with_error(error);
        }
        if !visitor.fields.is_empty() {
            options = options.with_metadata(visitor.fields);
        }

        self.logger
            .log(level, visitor.message.unwrap_or_default(), options);
    }
}

/// Visitor that sorts event fields into message, request id, error and metadata
#[derive(Default)]
struct EntryVisitor {
    message: Option<String>,
    request_id: Option<String>,
    error: Option<ErrorInfo>,
    fields: Metadata,
}

impl EntryVisitor {
    fn record_value(&mut self, field: &Field, value: Value) {
        let name = field.name();
        if name == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else if REQUEST_ID_FIELDS.contains(&name) {
            self.request_id = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(name.to_string(), value);
        }
    }
}

impl Visit for EntryVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let mut buf = String::new();
        let _ = write!(&mut buf, "{:?}", value);
        self.record_value(field, Value::String(buf));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, Value::Number(value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, Value::Bool(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.record_value(field, Value::Number(n));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if self.error.is_none() {
            self.error = Some(ErrorInfo::from_error(value));
        } else {
            self.record_value(field, Value::String(value.to_string()));
        }
    }
}

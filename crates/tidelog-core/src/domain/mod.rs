//! Domain types for the logging pipeline
//!
//! - `log_entry` - LogEntry, LogLevel, ErrorInfo, LogOptions
//! - `config` - LoggingConfig and its environment resolver

pub mod config;
mod log_entry;

pub use config::{resolve_once, LogFormat, LoggingConfig};
pub use log_entry::*;

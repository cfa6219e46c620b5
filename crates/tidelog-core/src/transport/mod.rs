//! Transports - sinks that receive log entries
//!
//! - `console` - colored stdout/stderr lines
//! - `file` - active file with size-based rotation and numbered archives
//! - `writer` - the task that owns the file transport

mod console;
mod file;
pub mod format;
mod writer;

pub use console::ConsoleTransport;
pub use file::FileTransport;
pub use writer::{FileWriterHandle, Reporter};

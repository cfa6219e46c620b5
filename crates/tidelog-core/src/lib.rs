//! # Tidelog Core Library
//!
//! Structured, level-filtered logging with console and size-rotated file
//! transports.
//!
//! ## Modules
//!
//! - `domain` - Log entries, levels, options and the resolved configuration
//! - `transport` - Console and file transports, the file writer task
//! - `logger` - The logger facade and the bootstrap default instance
//! - `layer` - Bridge from `tracing` events into the logger
//! - `error` - Pipeline errors

pub mod domain;
pub mod error;
pub mod layer;
pub mod logger;
pub mod transport;

// Re-export commonly used types
pub use domain::*;
pub use error::LoggingError;
pub use layer::LoggerLayer;
pub use logger::Logger;
pub use transport::{ConsoleTransport, FileTransport, FileWriterHandle};

//! File transport integration tests
//!
//! Drive a file-only JSON logger and read its output back from disk.

mod file_output;

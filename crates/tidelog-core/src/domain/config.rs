//! Logging configuration resolved from the process environment

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use super::log_entry::LogLevel;
use crate::error::{LoggingError, Result};

/// Environment variable names read by [`LoggingConfig::from_env`]
pub mod env_keys {
    pub const APP_ENV: &str = "APP_ENV";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const LOG_DIR: &str = "LOG_DIR";
    pub const LOG_FILE_NAME: &str = "LOG_FILE_NAME";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
    pub const LOG_TO_FILE: &str = "LOG_TO_FILE";
    pub const LOG_TO_CONSOLE: &str = "LOG_TO_CONSOLE";
    pub const LOG_MAX_FILE_SIZE: &str = "LOG_MAX_FILE_SIZE";
    pub const LOG_MAX_FILES: &str = "LOG_MAX_FILES";
}

pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_FILE_NAME: &str = "app.log";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
pub const DEFAULT_MAX_FILES: usize = 5;

/// Serialization format of the file transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human-readable blocks
    #[default]
    Text,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "text" | "pretty" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Immutable logging configuration.
///
/// Built once at startup and shared read-only (`Arc<LoggingConfig>`) by the
/// logger and both transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Severity threshold
    pub level: LogLevel,
    pub enable_console: bool,
    pub enable_file_transport: bool,
    pub log_dir: PathBuf,
    /// Name of the active file; archives append `.1`, `.2`, ...
    pub log_file_name: String,
    /// Rotation threshold (bytes)
    pub max_file_size: u64,
    /// Number of archives kept
    pub max_files: usize,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Debug,
            enable_console: true,
            enable_file_transport: false,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_file_name: DEFAULT_LOG_FILE_NAME.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Values that fail to parse fall back to the default for their key.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = is_production(lookup(env_keys::APP_ENV).as_deref());
        let defaults = Self::default();

        let level = lookup(env_keys::LOG_LEVEL)
            .and_then(|v| LogLevel::parse(&v))
            .unwrap_or(if production {
                LogLevel::Info
            } else {
                LogLevel::Debug
            });

        // Production turns the file on unless LOG_TO_FILE says otherwise
        let enable_file_transport = lookup(env_keys::LOG_TO_FILE)
            .and_then(|v| parse_flag(&v))
            .unwrap_or(production);

        let enable_console = lookup(env_keys::LOG_TO_CONSOLE)
            .and_then(|v| parse_flag(&v))
            .unwrap_or(defaults.enable_console);

        let log_dir = lookup(env_keys::LOG_DIR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.log_dir);

        let log_file_name = lookup(env_keys::LOG_FILE_NAME)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.log_file_name);

        let max_file_size = lookup(env_keys::LOG_MAX_FILE_SIZE)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(defaults.max_file_size);

        let max_files = lookup(env_keys::LOG_MAX_FILES)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(defaults.max_files);

        let format = lookup(env_keys::LOG_FORMAT)
            .and_then(|v| LogFormat::parse(&v))
            .unwrap_or(defaults.format);

        Self {
            level,
            enable_console,
            enable_file_transport,
            log_dir,
            log_file_name,
            max_file_size,
            max_files,
            format,
        }
    }

    /// Create the log directory when the file transport needs it.
    ///
    /// Switches to `fallback_dir` if the configured directory cannot be
    /// created. Fails only when no usable directory remains.
    pub fn prepare(mut self, fallback_dir: Option<&Path>) -> Result<Self> {
        if !self.enable_file_transport {
            return Ok(self);
        }

        let primary_err = match std::fs::create_dir_all(&self.log_dir) {
            Ok(()) => return Ok(self),
            Err(e) => e,
        };

        let Some(fallback) = fallback_dir else {
            return Err(LoggingError::Configuration {
                path: self.log_dir,
                source: primary_err,
            });
        };

        std::fs::create_dir_all(fallback).map_err(|source| LoggingError::Configuration {
            path: fallback.to_path_buf(),
            source,
        })?;

        eprintln!(
            "Warning: cannot create log directory {:?} ({}), using {:?}",
            self.log_dir, primary_err, fallback
        );
        self.log_dir = fallback.to_path_buf();
        Ok(self)
    }

    /// Path of the active log file
    pub fn active_file_path(&self) -> PathBuf {
        self.log_dir.join(&self.log_file_name)
    }
}

static RESOLVED: OnceLock<Arc<LoggingConfig>> = OnceLock::new();

/// Resolve the configuration from the environment on first call and cache it
/// for the rest of the process.
pub fn resolve_once(fallback_dir: Option<&Path>) -> Result<Arc<LoggingConfig>> {
    if let Some(config) = RESOLVED.get() {
        return Ok(config.clone());
    }

    let config = Arc::new(LoggingConfig::from_env().prepare(fallback_dir)?);
    Ok(RESOLVED.get_or_init(|| config).clone())
}

fn is_production(mode: Option<&str>) -> bool {
    matches!(
        mode.map(|m| m.trim().to_lowercase()).as_deref(),
        Some("production") | Some("prod")
    )
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

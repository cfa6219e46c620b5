//! File transport - append-only active file with numbered archives

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::format::render_block;
use crate::domain::{LogEntry, LogFormat, LoggingConfig};
use crate::error::{LoggingError, Result};

/// Writer for the active log file.
///
/// Layout inside `log_dir`:
///
/// ```text
/// app.log      active file, always appended to
/// app.log.1    most recent archive
/// app.log.N    oldest archive (N = max_files)
/// ```
pub struct FileTransport {
    log_dir: PathBuf,
    file_name: String,
    max_file_size: u64,
    max_files: usize,
    format: LogFormat,
    current_file: Option<File>,
}

impl FileTransport {
    /// Open (or create) the active file described by `config`
    pub async fn open(config: &LoggingConfig) -> Result<Self> {
        let mut transport = Self {
            log_dir: config.log_dir.clone(),
            file_name: config.log_file_name.clone(),
            max_file_size: config.max_file_size,
            max_files: config.max_files,
            format: config.format,
            current_file: None,
        };
        transport.ensure_open().await?;
        transport.prune_stale_archives().await?;
        Ok(transport)
    }

    pub fn active_path(&self) -> PathBuf {
        self.log_dir.join(&self.file_name)
    }

    /// Path of archive `index` (1 = newest)
    pub fn archive_path(&self, index: usize) -> PathBuf {
        self.log_dir.join(format!("{}.{}", self.file_name, index))
    }

    pub fn is_open(&self) -> bool {
        self.current_file.is_some()
    }

    /// Rotate if needed, then append the entry
    pub async fn write(&mut self, entry: &LogEntry) -> Result<()> {
        self.rotate_if_needed().await?;
        self.append(entry).await
    }

    /// Rotate when the active file has grown past `max_file_size`.
    ///
    /// Returns whether a rotation happened.
    pub async fn rotate_if_needed(&mut self) -> Result<bool> {
        if self.active_size().await > self.max_file_size {
            self.rotate().await?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Serialize an entry in the configured format
    pub fn serialize(&self, entry: &LogEntry) -> Result<String> {
        match self.format {
            LogFormat::Json => {
                let mut line = serde_json::to_string(entry)?;
                line.push('\n');
                Ok(line)
            }
            LogFormat::Text => Ok(render_block(entry)),
        }
    }

    /// Append an entry to the active file without checking its size
    pub async fn append(&mut self, entry: &LogEntry) -> Result<()> {
        let payload = self.serialize(entry)?;
        let path = self.active_path();
        let file = self.ensure_open().await?;

        file.write_all(payload.as_bytes())
            .await
            .map_err(|source| LoggingError::TransportWrite {
                path: path.clone(),
                source,
            })?;
        file.flush()
            .await
            .map_err(|source| LoggingError::TransportWrite { path, source })?;

        Ok(())
    }

    /// Archive the active file and start a fresh one.
    ///
    /// Missing files are skipped, so repeating an interrupted rotation is
    /// harmless.
    pub async fn rotate(&mut self) -> Result<()> {
        // Close current file
        if let Some(mut file) = self.current_file.take() {
            let _ = file.flush().await;
        }

        let active = self.active_path();

        if self.max_files == 0 {
            remove_if_exists(&active).await?;
        } else {
            // Evict the oldest archive, then shift the rest up by one
            remove_if_exists(&self.archive_path(self.max_files)).await?;
            for index in (1..self.max_files).rev() {
                rename_if_exists(&self.archive_path(index), &self.archive_path(index + 1)).await?;
            }
            rename_if_exists(&active, &self.archive_path(1)).await?;
        }

        self.ensure_open().await?;
        Ok(())
    }

    /// Flush and release the active handle
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.current_file.take() {
            file.flush()
                .await
                .map_err(|source| LoggingError::TransportWrite {
                    path: self.active_path(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Delete archives numbered above `max_files`, left behind by an earlier
    /// run that kept more of them.
    async fn prune_stale_archives(&self) -> Result<()> {
        let dir_error = |source| LoggingError::Rotation {
            path: self.log_dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.log_dir).await.map_err(dir_error)?;
        let prefix = format!("{}.", self.file_name);

        while let Some(entry) = entries.next_entry().await.map_err(dir_error)? {
            let file_name = entry.file_name();
            let index = file_name
                .to_str()
                .and_then(|name| name.strip_prefix(&prefix))
                .and_then(|suffix| suffix.parse::<usize>().ok());

            if matches!(index, Some(index) if index > self.max_files) {
                remove_if_exists(&entry.path()).await?;
            }
        }
        Ok(())
    }

    /// Current size of the active file; a vanished file counts as empty and
    /// drops the stale handle so the next append recreates it.
    async fn active_size(&mut self) -> u64 {
        match tokio::fs::metadata(self.active_path()).await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                if e.kind() == ErrorKind::NotFound {
                    self.current_file = None;
                }
                0
            }
        }
    }

    /// Write without flushing, leaving the outcome to the next flush
    #[cfg(test)]
    pub(crate) async fn append_unflushed(&mut self, entry: &LogEntry) -> Result<()> {
        let payload = self.serialize(entry)?;
        let path = self.active_path();
        self.ensure_open()
            .await?
            .write_all(payload.as_bytes())
            .await
            .map_err(|source| LoggingError::TransportWrite { path, source })
    }

    async fn ensure_open(&mut self) -> Result<&mut File> {
        let file = match self.current_file.take() {
            Some(file) => file,
            None => {
                let path = self.active_path();
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .await
                    .map_err(|source| LoggingError::TransportWrite { path, source })?
            }
        };
        Ok(self.current_file.insert(file))
    }
}

async fn rename_if_exists(from: &Path, to: &Path) -> Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LoggingError::Rotation {
            path: from.to_path_buf(),
            source,
        }),
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LoggingError::Rotation {
            path: path.to_path_buf(),
            source,
        }),
    }
}

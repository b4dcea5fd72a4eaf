//! Append-only update queue, one per versioned document.
//!
//! For a document at `dir/name.md`, the queue owns two plain-text files in a
//! sidecar directory next to the document (default `dir/.draftlog/`):
//!
//! - `name.md.log` — newline-delimited [`LogEntry`] records, one JSON object
//!   per line, in append order
//! - `name.md.seq` — a single decimal integer, the last assigned sequence
//!   number for this document
//!
//! Both files are designed to be diffable and recoverable by manual
//! inspection. The queue keeps no in-memory state between calls, so it is
//! safe across process restarts; it does not coordinate concurrent writers
//! (single-writer discipline is the caller's responsibility).

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::VersioningConfig;
use crate::error::{Result, VersioningError};

/// One line in the append-only log.
///
/// Entries are immutable once appended; the log is read in file order, which
/// is the append order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Identity of the writer that appended this entry.
    pub device_id: String,
    /// Monotonically increasing sequence number, unique per (document, device).
    pub device_seq: u64,
    /// Encoded [`EntryPayload`](crate::payload::EntryPayload); base64, never
    /// contains a newline.
    pub payload: String,
}

/// Durable, ordered storage of [`LogEntry`] records for one document.
#[derive(Debug, Clone)]
pub struct UpdateQueue {
    log_path: PathBuf,
    seq_path: PathBuf,
}

impl UpdateQueue {
    /// Create the queue handle for a document path.
    ///
    /// This computes the sidecar file locations but touches nothing on disk;
    /// files are created lazily on the first append.
    pub fn for_document(document: &Path, config: &VersioningConfig) -> Result<Self> {
        let parent = document
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| VersioningError::NoParentDir(document.to_path_buf()))?;
        let file_name = document
            .file_name()
            .ok_or_else(|| VersioningError::NoFileName(document.to_path_buf()))?
            .to_string_lossy();

        let sidecar = parent.join(&config.sidecar_dir_name);
        Ok(Self {
            log_path: sidecar.join(format!("{}.{}", file_name, config.log_extension)),
            seq_path: sidecar.join(format!("{}.{}", file_name, config.seq_extension)),
        })
    }

    /// Path of the backing log file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Append one entry to the log and flush.
    ///
    /// Creates the sidecar directory on first use.
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        self.ensure_sidecar_dir()?;

        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|source| VersioningError::FileWrite {
                path: self.log_path.clone(),
                source,
            })?;
        writeln!(file, "{}", line).map_err(|source| VersioningError::FileWrite {
            path: self.log_path.clone(),
            source,
        })?;
        file.flush().map_err(|source| VersioningError::FileWrite {
            path: self.log_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Read every entry in file order.
    ///
    /// Returns an empty list if the log file does not exist yet. A line that
    /// fails to parse as a [`LogEntry`] is skipped with a warning; the rest
    /// of the log is still returned.
    pub fn read_all(&self) -> Result<Vec<LogEntry>> {
        let content = match fs::read_to_string(&self.log_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(VersioningError::FileRead {
                    path: self.log_path.clone(),
                    source,
                });
            }
        };

        let mut entries = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    log::warn!(
                        "skipping unparsable line in {}: {}",
                        self.log_path.display(),
                        e
                    );
                }
            }
        }
        Ok(entries)
    }

    /// Clear all entries from the log.
    ///
    /// The sequence counter is deliberately left alone: new entries continue
    /// from the last assigned number, so a sequence value is never reused for
    /// two different entries of the same document.
    pub fn truncate(&self) -> Result<()> {
        self.ensure_sidecar_dir()?;
        fs::write(&self.log_path, "").map_err(|source| VersioningError::FileWrite {
            path: self.log_path.clone(),
            source,
        })
    }

    /// Increment the persisted sequence counter and return the new value.
    ///
    /// The counter starts at zero for a document with no counter file, so the
    /// first value handed out is 1. Strictly monotonic across process
    /// restarts; not atomic across processes.
    pub fn next_seq(&self) -> Result<u64> {
        let current = match fs::read_to_string(&self.seq_path) {
            Ok(content) => {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    0
                } else {
                    trimmed
                        .parse::<u64>()
                        .map_err(|_| VersioningError::CounterParse {
                            path: self.seq_path.clone(),
                            value: trimmed.to_string(),
                        })?
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(source) => {
                return Err(VersioningError::FileRead {
                    path: self.seq_path.clone(),
                    source,
                });
            }
        };

        let next = current + 1;
        self.ensure_sidecar_dir()?;
        fs::write(&self.seq_path, next.to_string()).map_err(|source| {
            VersioningError::FileWrite {
                path: self.seq_path.clone(),
                source,
            }
        })?;
        Ok(next)
    }

    fn ensure_sidecar_dir(&self) -> Result<()> {
        if let Some(dir) = self.log_path.parent() {
            fs::create_dir_all(dir).map_err(|source| VersioningError::FileWrite {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

//! Synchronization of an editable text block with its backing file.
//!
//! A [`TextBlock`] binds an in-memory buffer to a file on disk and keeps the
//! two reconciled. External changes are detected with a modification-time
//! check; when both sides changed, editable blocks are merged conservatively
//! (see [`crate::merge`]) and read-only blocks adopt the file outright.
//!
//! The block tracks a baseline: the last text known to be synchronized
//! between buffer and file. It is a heuristic anchor for deciding which side
//! changed, not a three-way merge ancestor.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VersioningError};
use crate::events::{SyncBus, VersioningEvent};
use crate::merge::merge;

/// Synchronization status of a text block relative to its backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Buffer matches the last-known file content.
    Clean,
    /// Buffer changed since the baseline, file unchanged.
    LocallyModified,
    /// File changed since the baseline, buffer unchanged.
    ExternallyModified,
    /// Both sides changed since the baseline.
    Diverged,
}

/// Reconcile an in-memory buffer with externally changed file content.
///
/// For editable blocks this is the conservative two-way merge; for
/// non-editable blocks the file always wins outright.
pub fn reconcile_block(buffer_text: &str, file_text: &str, is_editable: bool) -> String {
    if is_editable {
        merge(buffer_text, file_text)
    } else {
        file_text.to_string()
    }
}

/// An in-memory text buffer bound to a backing file.
pub struct TextBlock {
    path: PathBuf,
    buffer: String,
    /// Last text known to be synchronized between buffer and file.
    baseline: String,
    last_mtime: Option<SystemTime>,
    editable: bool,
    bus: Option<Arc<SyncBus>>,
}

impl TextBlock {
    /// Bind a block to a file, reading its current content as the baseline.
    pub fn bind(path: impl Into<PathBuf>, editable: bool) -> Result<Self> {
        let path = path.into();
        let content = fs::read_to_string(&path).map_err(|source| VersioningError::FileRead {
            path: path.clone(),
            source,
        })?;
        let last_mtime = fs::metadata(&path).and_then(|m| m.modified()).ok();
        Ok(Self {
            path,
            buffer: content.clone(),
            baseline: content,
            last_mtime,
            editable,
            bus: None,
        })
    }

    /// Attach a bus; reconciliations will be published on it.
    pub fn with_bus(mut self, bus: Arc<SyncBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Current buffer content.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Current merge baseline.
    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    /// Whether this block accepts local edits.
    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// Record a local edit to the buffer.
    ///
    /// Edits to non-editable blocks are ignored.
    pub fn set_buffer(&mut self, text: impl Into<String>) {
        if self.editable {
            self.buffer = text.into();
        }
    }

    /// Current status of this block relative to its backing file.
    pub fn status(&self) -> Result<SyncStatus> {
        let local = self.buffer != self.baseline;
        let external = self.file_changed_on_disk()?;
        Ok(match (local, external) {
            (false, false) => SyncStatus::Clean,
            (true, false) => SyncStatus::LocallyModified,
            (false, true) => SyncStatus::ExternallyModified,
            (true, true) => SyncStatus::Diverged,
        })
    }

    /// Bring buffer and file back in sync, returning the status that was
    /// resolved.
    ///
    /// - `Clean`: nothing to do
    /// - `LocallyModified`: plain write-through of the buffer
    /// - `ExternallyModified`: adopt the file content
    /// - `Diverged`: editable blocks merge and write the result to both
    ///   sides; non-editable blocks adopt the file outright
    ///
    /// After a successful call the block is `Clean` and the baseline is the
    /// newly agreed text.
    pub fn synchronize(&mut self) -> Result<SyncStatus> {
        let status = self.status()?;
        match status {
            SyncStatus::Clean => {}
            SyncStatus::LocallyModified => {
                let text = self.buffer.clone();
                self.write_file(&text)?;
                self.baseline = text;
            }
            SyncStatus::ExternallyModified => {
                let file_text = self.read_file()?;
                self.buffer = file_text.clone();
                self.baseline = file_text;
                self.last_mtime = self.current_mtime();
            }
            SyncStatus::Diverged => {
                let file_text = self.read_file()?;
                let merged = reconcile_block(&self.buffer, &file_text, self.editable);
                if merged != file_text {
                    self.write_file(&merged)?;
                }
                self.buffer = merged.clone();
                self.baseline = merged;
                self.last_mtime = self.current_mtime();
            }
        }

        if status != SyncStatus::Clean
            && let Some(bus) = &self.bus
        {
            bus.emit(&VersioningEvent::BlockReconciled {
                document: self.path.clone(),
                resolved_from: status,
            });
        }
        Ok(status)
    }

    fn file_changed_on_disk(&self) -> Result<bool> {
        let mtime = self.current_mtime();
        Ok(match (self.last_mtime, mtime) {
            (Some(last), Some(current)) => current > last,
            // A file that disappeared or lost its metadata is treated as
            // unchanged; emptiness on read will be handled by the merge bias.
            _ => false,
        })
    }

    fn current_mtime(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    fn read_file(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|source| VersioningError::FileRead {
            path: self.path.clone(),
            source,
        })
    }

    fn write_file(&mut self, content: &str) -> Result<()> {
        fs::write(&self.path, content).map_err(|source| VersioningError::FileWrite {
            path: self.path.clone(),
            source,
        })?;
        self.last_mtime = self.current_mtime();
        Ok(())
    }
}

//! Host-facing versioning engine.
//!
//! [`VersioningEngine`] is the boundary the surrounding application talks
//! to. Versioning is auxiliary to the host's primary job of saving and
//! editing documents, so the host-facing operations never let a failure
//! escape: [`VersioningEngine::enqueue_update`] swallows errors after
//! logging them, and [`VersioningEngine::load_history`] collapses failures
//! to an empty list. The `try_` variants keep the explicit [`Result`] for
//! hosts that need to distinguish "no history" from "could not read it".

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::block::reconcile_block;
use crate::config::VersioningConfig;
use crate::diff::make_diff;
use crate::error::Result;
use crate::events::{SyncBus, VersioningEvent};
use crate::history::{ReconstructedState, latest_state, reconstruct_all};
use crate::payload::{EntryPayload, encode};
use crate::queue::{LogEntry, UpdateQueue};

/// A logical writer identity, one per installation or process.
///
/// Tags log entries for attribution across devices; it is not a concurrency
/// primitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap an existing identifier chosen by the host.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The versioning engine: records revisions, reconstructs history, and
/// reconciles diverged text blocks.
///
/// Construct one per process and share it by reference.
pub struct VersioningEngine {
    config: VersioningConfig,
    device_id: DeviceId,
    bus: Arc<SyncBus>,
}

impl VersioningEngine {
    /// Create an engine with the default configuration.
    pub fn new(device_id: DeviceId) -> Self {
        Self::with_config(device_id, VersioningConfig::default())
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(device_id: DeviceId, config: VersioningConfig) -> Self {
        Self {
            config,
            device_id,
            bus: Arc::new(SyncBus::new()),
        }
    }

    /// The engine's event bus.
    pub fn bus(&self) -> &Arc<SyncBus> {
        &self.bus
    }

    /// This engine's writer identity.
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// The active configuration.
    pub fn config(&self) -> &VersioningConfig {
        &self.config
    }

    /// Record a revision of a document; never fails.
    ///
    /// Called by the host after every persisted save. Failures are logged
    /// and swallowed so they can never abort the save that triggered them.
    pub fn enqueue_update(&self, document: &Path, body_text: &str, body_rendered: Option<&str>) {
        if let Err(e) = self.try_enqueue_update(document, body_text, body_rendered) {
            log::warn!(
                "failed to record revision of {}: {}",
                document.display(),
                e
            );
        }
    }

    /// Record a revision of a document, reporting failures.
    ///
    /// Every Nth entry (the configured keyframe interval) is written as a
    /// full snapshot; the rest are diffs against the latest reconstructable
    /// state. When no prior state can be recovered at all, a snapshot is
    /// written regardless of the counter so the log heals itself.
    pub fn try_enqueue_update(
        &self,
        document: &Path,
        body_text: &str,
        body_rendered: Option<&str>,
    ) -> Result<()> {
        let queue = UpdateQueue::for_document(document, &self.config)?;
        let entries = queue.read_all()?;

        let keyframe_due = entries.len() % self.config.keyframe_interval.max(1) == 0;
        let payload = match latest_state(&entries) {
            Some(previous) if !keyframe_due => {
                let diff_text = make_diff(&previous.body_text, body_text);
                // A rendered diff needs both a rendered baseline and a new
                // rendered form; otherwise the entry carries none and the
                // representation carries forward on replay.
                let diff_rendered = match (previous.body_rendered.as_deref(), body_rendered) {
                    (Some(old), Some(new)) => Some(make_diff(old, new)),
                    _ => None,
                };
                EntryPayload::diff(diff_text, diff_rendered)
            }
            _ => EntryPayload::snapshot(body_text, body_rendered.map(|r| r.to_string())),
        };
        let entry_type = payload.entry_type;

        let device_seq = queue.next_seq()?;
        queue.append(&LogEntry {
            device_id: self.device_id.to_string(),
            device_seq,
            payload: encode(&payload)?,
        })?;

        self.bus.emit(&VersioningEvent::EntryRecorded {
            document: document.to_path_buf(),
            entry_type,
            device_seq,
        });
        Ok(())
    }

    /// Reconstruct the full revision history of a document.
    ///
    /// Returns an empty list when no history exists or the log cannot be
    /// read; a host showing a revisions panel treats that as "no revisions
    /// recorded yet".
    pub fn load_history(&self, document: &Path) -> Vec<ReconstructedState> {
        match self.try_load_history(document) {
            Ok(states) => states,
            Err(e) => {
                log::warn!("failed to load history of {}: {}", document.display(), e);
                Vec::new()
            }
        }
    }

    /// Reconstruct the full revision history, reporting read failures.
    pub fn try_load_history(&self, document: &Path) -> Result<Vec<ReconstructedState>> {
        let queue = UpdateQueue::for_document(document, &self.config)?;
        let states = reconstruct_all(&queue.read_all()?);
        self.bus.emit(&VersioningEvent::HistoryLoaded {
            document: document.to_path_buf(),
            revisions: states.len(),
        });
        Ok(states)
    }

    /// The most recent recorded revision, or `None` if there is none.
    pub fn latest_revision(&self, document: &Path) -> Option<ReconstructedState> {
        let queue = UpdateQueue::for_document(document, &self.config).ok()?;
        let entries = queue.read_all().ok()?;
        latest_state(&entries)
    }

    /// Reconcile an in-memory buffer with externally changed file content.
    ///
    /// See [`reconcile_block`]; exposed here so hosts only need the engine.
    pub fn reconcile_block(&self, buffer_text: &str, file_text: &str, is_editable: bool) -> String {
        reconcile_block(buffer_text, file_text, is_editable)
    }

    /// Erase a document's recorded history.
    ///
    /// An explicit reset, not part of normal operation. The sequence counter
    /// survives, so entries written afterwards continue from the last
    /// assigned number.
    pub fn truncate_history(&self, document: &Path) -> Result<()> {
        UpdateQueue::for_document(document, &self.config)?.truncate()
    }
}

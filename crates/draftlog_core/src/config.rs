//! Configuration types for draftlog.
//!
//! [`VersioningConfig`] collects the knobs that control how revision history
//! is stored on disk: how often a full snapshot keyframe is written, and how
//! the per-document sidecar files are named. The host application owns the
//! persistence of these settings; this crate only consumes the struct.

use serde::{Deserialize, Serialize};

/// How often a full snapshot keyframe is written, in entries.
///
/// Every `keyframe_interval`-th entry stores the complete document text
/// instead of a diff, which bounds the replay cost of reconstructing any
/// historical revision to at most `keyframe_interval - 1` diff applications.
pub const DEFAULT_KEYFRAME_INTERVAL: usize = 50;

/// Default name of the per-directory sidecar folder holding log and counter files.
pub const DEFAULT_SIDECAR_DIR: &str = ".draftlog";

/// `VersioningConfig` holds the user-configurable parts of revision storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersioningConfig {
    /// Write a full snapshot every Nth entry; diffs in between.
    #[serde(default = "default_keyframe_interval")]
    pub keyframe_interval: usize,

    /// Name of the sidecar directory created next to each versioned document.
    #[serde(default = "default_sidecar_dir_name")]
    pub sidecar_dir_name: String,

    /// Extension appended to the document file name for the append-only log.
    #[serde(default = "default_log_extension")]
    pub log_extension: String,

    /// Extension appended to the document file name for the sequence counter.
    #[serde(default = "default_seq_extension")]
    pub seq_extension: String,
}

fn default_keyframe_interval() -> usize {
    DEFAULT_KEYFRAME_INTERVAL
}

fn default_sidecar_dir_name() -> String {
    DEFAULT_SIDECAR_DIR.to_string()
}

fn default_log_extension() -> String {
    "log".to_string()
}

fn default_seq_extension() -> String {
    "seq".to_string()
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            keyframe_interval: default_keyframe_interval(),
            sidecar_dir_name: default_sidecar_dir_name(),
            log_extension: default_log_extension(),
            seq_extension: default_seq_extension(),
        }
    }
}

impl VersioningConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the keyframe interval.
    ///
    /// An interval of 1 makes every entry a full snapshot. A value of 0 is
    /// normalized to 1 so the modulo arithmetic at write time stays defined.
    pub fn with_keyframe_interval(mut self, interval: usize) -> Self {
        self.keyframe_interval = interval.max(1);
        self
    }

    /// Set the sidecar directory name.
    pub fn with_sidecar_dir_name(mut self, name: impl Into<String>) -> Self {
        self.sidecar_dir_name = name.into();
        self
    }
}

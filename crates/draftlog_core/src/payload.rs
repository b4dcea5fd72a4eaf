//! Entry payload codec.
//!
//! An [`EntryPayload`] is the logical content of one log entry: either a full
//! snapshot of the document text or a diff against the previous reconstructed
//! state. On the wire it is canonical JSON wrapped in base64, so the encoded
//! form is guaranteed to be a single line with no embedded newlines no matter
//! what the document text contains.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VersioningError};

/// Current payload format version tag.
pub const PAYLOAD_VERSION: u32 = 1;

/// Whether a payload carries a full snapshot or a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Full document text; reconstructable without a predecessor.
    ///
    /// This is the serde default so that entries written before the
    /// `entry_type` field existed decode as snapshots.
    #[default]
    Snapshot,
    /// Unified diff against the immediately preceding reconstructed text.
    Diff,
}

/// The logical content of one log entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPayload {
    /// Format version tag.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Snapshot or diff.
    #[serde(default)]
    pub entry_type: EntryType,

    /// RFC 3339 timestamp of the save that produced this entry.
    #[serde(default)]
    pub saved_at: String,

    /// Full document text (snapshot entries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_text: Option<String>,

    /// Optional secondary representation, e.g. rendered HTML (snapshot entries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_rendered: Option<String>,

    /// Diff against the previous body text (diff entries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_text: Option<String>,

    /// Diff against the previous rendered representation (diff entries).
    ///
    /// May be absent even when `diff_text` is present; the rendered
    /// representation then carries forward unchanged during reconstruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_rendered: Option<String>,
}

fn default_version() -> u32 {
    PAYLOAD_VERSION
}

impl EntryPayload {
    /// Create a snapshot payload stamped with the current time.
    pub fn snapshot(body_text: impl Into<String>, body_rendered: Option<String>) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            entry_type: EntryType::Snapshot,
            saved_at: chrono::Utc::now().to_rfc3339(),
            body_text: Some(body_text.into()),
            body_rendered,
            diff_text: None,
            diff_rendered: None,
        }
    }

    /// Create a diff payload stamped with the current time.
    pub fn diff(diff_text: impl Into<String>, diff_rendered: Option<String>) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            entry_type: EntryType::Diff,
            saved_at: chrono::Utc::now().to_rfc3339(),
            body_text: None,
            body_rendered: None,
            diff_text: Some(diff_text.into()),
            diff_rendered,
        }
    }
}

/// Encode a payload to its single-line wire form (JSON in base64).
pub fn encode(payload: &EntryPayload) -> Result<String> {
    let json = serde_json::to_string(payload)?;
    Ok(BASE64.encode(json))
}

/// Decode a payload from its wire form.
///
/// Unknown fields are ignored and missing fields take conservative defaults
/// (`entry_type` defaults to [`EntryType::Snapshot`]) so that logs written by
/// older or newer versions still decode.
pub fn decode(encoded: &str) -> Result<EntryPayload> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| VersioningError::Decode(format!("invalid base64: {}", e)))?;
    let json = String::from_utf8(bytes)
        .map_err(|e| VersioningError::Decode(format!("invalid UTF-8: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| VersioningError::Decode(format!("invalid JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_snapshot() {
        let payload = EntryPayload::snapshot("# Title\n\nPara one.\n", Some("<h1>Title</h1>".into()));
        let decoded = decode(&encode(&payload).unwrap()).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_round_trip_diff_without_rendered() {
        let payload = EntryPayload::diff("@@ -1,1 +1,1 @@\n-a\n+b\n", None);
        let decoded = decode(&encode(&payload).unwrap()).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(decoded.entry_type, EntryType::Diff);
        assert!(decoded.diff_rendered.is_none());
    }

    #[test]
    fn test_encoded_form_is_single_line() {
        let payload = EntryPayload::snapshot("line one\nline two\nline three\n", None);
        let encoded = encode(&payload).unwrap();
        assert!(!encoded.contains('\n'));
        assert!(!encoded.contains('\r'));
    }

    #[test]
    fn test_missing_entry_type_defaults_to_snapshot() {
        let json = r#"{"version":1,"saved_at":"2026-01-01T00:00:00Z","body_text":"hello\n"}"#;
        let encoded = BASE64.encode(json);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.entry_type, EntryType::Snapshot);
        assert_eq!(decoded.body_text.as_deref(), Some("hello\n"));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{"entry_type":"diff","diff_text":"","future_field":42}"#;
        let encoded = BASE64.encode(json);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.entry_type, EntryType::Diff);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode("not base64 at all!!!"),
            Err(VersioningError::Decode(_))
        ));
        let not_json = BASE64.encode("this is not json");
        assert!(matches!(decode(&not_json), Err(VersioningError::Decode(_))));
    }
}

//! Snapshot/diff reconstruction.
//!
//! Replays a queue's entries in order, materializing the document text at
//! every point. Snapshot entries reset the running state; diff entries are
//! applied on top of it. A corrupted entry is skipped individually and never
//! aborts reconstruction of the entries after it, so a log remains useful
//! even with damaged lines in the middle.

use serde::{Deserialize, Serialize};

use crate::diff::apply_diff;
use crate::payload::{self, EntryType};
use crate::queue::LogEntry;

/// The materialized result of replaying entries up to some point.
///
/// Produced on demand; never persisted separately from the log itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructedState {
    /// Full document text at this point in history.
    pub body_text: String,
    /// Secondary representation, when known at this point in history.
    pub body_rendered: Option<String>,
    /// RFC 3339 timestamp of the save that produced this revision.
    pub saved_at: String,
    /// Writer that recorded this revision.
    pub device_id: String,
    /// Sequence number of the underlying log entry.
    pub device_seq: u64,
}

/// Replay all entries, producing one state per successfully processed entry.
///
/// Skips undecodable entries, diff entries with no reconstructable
/// predecessor, and diffs that fail to apply; order is preserved for the
/// rest. The rendered representation follows the carry-forward rules: a diff
/// without `diff_rendered` leaves it unchanged, and a `diff_rendered` with no
/// known rendered baseline makes it unknown until the next full snapshot.
pub fn reconstruct_all(entries: &[LogEntry]) -> Vec<ReconstructedState> {
    let mut states = Vec::with_capacity(entries.len());
    let mut running_body: Option<String> = None;
    let mut running_rendered: Option<String> = None;

    for entry in entries {
        let payload = match payload::decode(&entry.payload) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!(
                    "skipping undecodable entry {} from '{}': {}",
                    entry.device_seq,
                    entry.device_id,
                    e
                );
                continue;
            }
        };

        match payload.entry_type {
            EntryType::Snapshot => {
                let Some(body_text) = payload.body_text else {
                    log::warn!("skipping snapshot entry {} with no body", entry.device_seq);
                    continue;
                };
                running_body = Some(body_text);
                running_rendered = payload.body_rendered;
            }
            EntryType::Diff => {
                let Some(diff_text) = payload.diff_text else {
                    log::warn!("skipping diff entry {} with no diff", entry.device_seq);
                    continue;
                };
                let Some(base) = running_body.as_deref() else {
                    // No snapshot has been seen yet; nothing to apply against.
                    log::warn!(
                        "skipping diff entry {} with no preceding snapshot",
                        entry.device_seq
                    );
                    continue;
                };
                let body_text = match apply_diff(base, &diff_text) {
                    Ok(text) => text,
                    Err(e) => {
                        log::warn!("skipping unappliable diff entry {}: {}", entry.device_seq, e);
                        continue;
                    }
                };
                running_body = Some(body_text);

                if let Some(diff_rendered) = payload.diff_rendered {
                    running_rendered = match running_rendered.take() {
                        Some(rendered) => apply_diff(&rendered, &diff_rendered).ok(),
                        // A rendered diff without a rendered baseline leaves
                        // the representation unknown until the next snapshot.
                        None => None,
                    };
                }
            }
        }

        states.push(ReconstructedState {
            body_text: running_body.clone().unwrap_or_default(),
            body_rendered: running_rendered.clone(),
            saved_at: payload.saved_at,
            device_id: entry.device_id.clone(),
            device_seq: entry.device_seq,
        });
    }

    states
}

/// The most recent reconstructable state, or `None` for an empty queue.
///
/// Equivalent to `reconstruct_all(entries).pop()` but replays only from the
/// last decodable snapshot keyframe, so the cost is bounded by the keyframe
/// interval rather than the log length.
pub fn latest_state(entries: &[LogEntry]) -> Option<ReconstructedState> {
    let start = entries
        .iter()
        .rposition(|entry| {
            matches!(
                payload::decode(&entry.payload),
                Ok(p) if p.entry_type == EntryType::Snapshot && p.body_text.is_some()
            )
        })
        .unwrap_or(0);
    reconstruct_all(&entries[start..]).pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::make_diff;
    use crate::payload::{EntryPayload, encode};

    fn entry(seq: u64, payload: &EntryPayload) -> LogEntry {
        LogEntry {
            device_id: "device-a".to_string(),
            device_seq: seq,
            payload: encode(payload).unwrap(),
        }
    }

    fn snapshot_entry(seq: u64, body: &str, rendered: Option<&str>) -> LogEntry {
        entry(
            seq,
            &EntryPayload::snapshot(body, rendered.map(|r| r.to_string())),
        )
    }

    fn diff_entry(seq: u64, old: &str, new: &str) -> LogEntry {
        entry(seq, &EntryPayload::diff(make_diff(old, new), None))
    }

    #[test]
    fn test_empty_queue() {
        assert!(reconstruct_all(&[]).is_empty());
        assert!(latest_state(&[]).is_none());
    }

    #[test]
    fn test_snapshot_then_diffs() {
        let v1 = "# Title\n\nPara one.\n";
        let v2 = "# Title\n\nPara one.\nPara two.\n";
        let v3 = "# Title\n\nPara two.\n";
        let entries = vec![
            snapshot_entry(1, v1, None),
            diff_entry(2, v1, v2),
            diff_entry(3, v2, v3),
        ];

        let states = reconstruct_all(&entries);
        assert_eq!(states.len(), 3);
        assert_eq!(states[0].body_text, v1);
        assert_eq!(states[1].body_text, v2);
        assert_eq!(states[2].body_text, v3);
        assert_eq!(states[2].device_seq, 3);

        assert_eq!(latest_state(&entries).unwrap(), states[2]);
    }

    #[test]
    fn test_snapshot_resets_state() {
        let entries = vec![
            snapshot_entry(1, "a\n", Some("<p>a</p>")),
            snapshot_entry(2, "completely new\n", None),
        ];

        let states = reconstruct_all(&entries);
        assert_eq!(states[1].body_text, "completely new\n");
        assert!(states[1].body_rendered.is_none());
    }

    #[test]
    fn test_corrupt_entry_in_middle_is_skipped() {
        let v1 = "a\n";
        let v2 = "a\nb\n";
        let entries = vec![
            snapshot_entry(1, v1, None),
            LogEntry {
                device_id: "device-a".to_string(),
                device_seq: 2,
                payload: "!!! not base64 !!!".to_string(),
            },
            diff_entry(3, v1, v2),
        ];

        let states = reconstruct_all(&entries);
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].device_seq, 1);
        assert_eq!(states[1].device_seq, 3);
        assert_eq!(states[1].body_text, v2);
    }

    #[test]
    fn test_diff_before_any_snapshot_is_skipped() {
        let entries = vec![
            diff_entry(1, "a\n", "b\n"),
            snapshot_entry(2, "fresh\n", None),
        ];

        let states = reconstruct_all(&entries);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].body_text, "fresh\n");
    }

    #[test]
    fn test_rendered_diff_applies_when_baseline_known() {
        let body1 = "a\n";
        let body2 = "b\n";
        let rendered1 = "<p>a</p>\n";
        let rendered2 = "<p>b</p>\n";
        let entries = vec![
            snapshot_entry(1, body1, Some(rendered1)),
            entry(
                2,
                &EntryPayload::diff(
                    make_diff(body1, body2),
                    Some(make_diff(rendered1, rendered2)),
                ),
            ),
        ];

        let states = reconstruct_all(&entries);
        assert_eq!(states[1].body_text, body2);
        assert_eq!(states[1].body_rendered.as_deref(), Some(rendered2));
    }

    #[test]
    fn test_rendered_diff_without_baseline_becomes_unknown() {
        let body1 = "a\n";
        let body2 = "b\n";
        let body3 = "c\n";
        let entries = vec![
            // Snapshot with no rendered representation.
            snapshot_entry(1, body1, None),
            entry(
                2,
                &EntryPayload::diff(make_diff(body1, body2), Some(make_diff("x\n", "y\n"))),
            ),
            diff_entry(3, body2, body3),
            snapshot_entry(4, body3, Some("<p>c</p>")),
        ];

        let states = reconstruct_all(&entries);
        assert!(states[1].body_rendered.is_none());
        assert!(states[2].body_rendered.is_none());
        // A full snapshot re-establishes the rendered representation.
        assert_eq!(states[3].body_rendered.as_deref(), Some("<p>c</p>"));
    }

    #[test]
    fn test_rendered_carried_forward_when_diff_has_none() {
        let body1 = "a\n";
        let body2 = "b\n";
        let entries = vec![
            snapshot_entry(1, body1, Some("<p>a</p>")),
            diff_entry(2, body1, body2),
        ];

        let states = reconstruct_all(&entries);
        assert_eq!(states[1].body_rendered.as_deref(), Some("<p>a</p>"));
    }

    #[test]
    fn test_latest_state_matches_full_replay_with_keyframes() {
        let versions: Vec<String> = (0..10).map(|i| format!("line {}\n", i)).collect();
        let mut entries = Vec::new();
        for (i, version) in versions.iter().enumerate() {
            let seq = (i + 1) as u64;
            // Keyframe every 4th entry, diffs in between.
            if i % 4 == 0 {
                entries.push(snapshot_entry(seq, version, None));
            } else {
                entries.push(diff_entry(seq, &versions[i - 1], version));
            }
        }

        let full = reconstruct_all(&entries);
        let latest = latest_state(&entries).unwrap();
        assert_eq!(Some(&latest), full.last());
        assert_eq!(latest.body_text, "line 9\n");
    }
}

//! Unified-diff codec for line-based text diffs.
//!
//! [`make_diff`] turns two text blobs into a zero-context unified diff, and
//! [`apply_diff`] turns `(base, diff)` back into the derived text. Context
//! lines are omitted because the reconstruction engine always has the exact
//! prior state, which keeps stored payloads small.
//!
//! The pair is its own inverse: `apply_diff(a, make_diff(a, b)) == b` for any
//! two texts, including texts without a trailing newline (encoded with the
//! conventional `\ No newline at end of file` marker).

use similar::{ChangeTag, DiffTag, TextDiff};

use crate::error::{Result, VersioningError};

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Compute a zero-context unified diff from `old` to `new`.
///
/// Returns an empty string when the inputs are equal (an empty hunk set).
/// Hunks are emitted in ascending order and never overlap.
pub fn make_diff(old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let ops = diff.ops();
    let mut out = String::new();

    let mut i = 0;
    while i < ops.len() {
        if ops[i].tag() == DiffTag::Equal {
            i += 1;
            continue;
        }

        // Coalesce a run of adjacent non-equal ops into one hunk.
        let mut j = i;
        while j < ops.len() && ops[j].tag() != DiffTag::Equal {
            j += 1;
        }

        let old_range = ops[i].old_range().start..ops[j - 1].old_range().end;
        let new_range = ops[i].new_range().start..ops[j - 1].new_range().end;

        let mut removed = Vec::new();
        let mut added = Vec::new();
        for op in &ops[i..j] {
            for change in diff.iter_changes(op) {
                match change.tag() {
                    ChangeTag::Delete => removed.push(change.value()),
                    ChangeTag::Insert => added.push(change.value()),
                    ChangeTag::Equal => {}
                }
            }
        }

        out.push_str(&hunk_header(&old_range, &new_range));
        for line in removed {
            push_content_line(&mut out, '-', line);
        }
        for line in added {
            push_content_line(&mut out, '+', line);
        }

        i = j;
    }

    out
}

/// Apply a diff produced by [`make_diff`] to `base`, yielding the derived text.
///
/// An empty `diff` returns `base` unchanged. Malformed or truncated diff text
/// yields [`VersioningError::MalformedDiff`]; callers replaying a log are
/// expected to handle that per entry rather than abort the whole replay.
pub fn apply_diff(base: &str, diff: &str) -> Result<String> {
    if diff.is_empty() {
        return Ok(base.to_string());
    }

    let base_lines: Vec<&str> = base.split_inclusive('\n').collect();
    let mut out = String::new();
    let mut pos = 0usize;
    let mut in_hunk = false;
    let mut last_was_addition = false;

    for record in diff.split_inclusive('\n') {
        if record.starts_with("@@") {
            let (old_start, old_count) = parse_hunk_header(record)?;
            // Hunk headers are 1-based for non-empty ranges; a zero-count
            // range addresses the gap after line `old_start`.
            let start = if old_count == 0 {
                old_start
            } else {
                old_start.checked_sub(1).ok_or_else(|| {
                    VersioningError::MalformedDiff(format!(
                        "hunk start must be positive: {}",
                        record.trim_end()
                    ))
                })?
            };
            if start < pos || start + old_count > base_lines.len() {
                return Err(VersioningError::MalformedDiff(format!(
                    "hunk out of range: {}",
                    record.trim_end()
                )));
            }
            for line in &base_lines[pos..start] {
                out.push_str(line);
            }
            pos = start + old_count;
            in_hunk = true;
            last_was_addition = false;
        } else if !in_hunk {
            return Err(VersioningError::MalformedDiff(
                "content before first hunk header".to_string(),
            ));
        } else if let Some(line) = record.strip_prefix('+') {
            out.push_str(line);
            last_was_addition = true;
        } else if record.starts_with('-') {
            // Removed lines are informational; the hunk header already
            // advanced the cursor past them.
            last_was_addition = false;
        } else if record.starts_with('\\') {
            // `\ No newline at end of file` after an added line means the
            // terminator we carried along is not part of the text.
            if last_was_addition && out.ends_with('\n') {
                out.pop();
            }
        } else {
            return Err(VersioningError::MalformedDiff(format!(
                "unrecognized diff line: {}",
                record.trim_end()
            )));
        }
    }

    for line in &base_lines[pos..] {
        out.push_str(line);
    }

    Ok(out)
}

fn hunk_header(old_range: &std::ops::Range<usize>, new_range: &std::ops::Range<usize>) -> String {
    let old_count = old_range.end - old_range.start;
    let new_count = new_range.end - new_range.start;
    let old_start = if old_count == 0 {
        old_range.start
    } else {
        old_range.start + 1
    };
    let new_start = if new_count == 0 {
        new_range.start
    } else {
        new_range.start + 1
    };
    format!("@@ -{},{} +{},{} @@\n", old_start, old_count, new_start, new_count)
}

fn push_content_line(out: &mut String, prefix: char, line: &str) {
    out.push(prefix);
    out.push_str(line);
    if !line.ends_with('\n') {
        out.push('\n');
        out.push_str(NO_NEWLINE_MARKER);
        out.push('\n');
    }
}

/// Parse `@@ -old_start,old_count +new_start,new_count @@` and return the
/// old-side range. The new-side range is implied by the added lines.
fn parse_hunk_header(record: &str) -> Result<(usize, usize)> {
    let malformed =
        || VersioningError::MalformedDiff(format!("bad hunk header: {}", record.trim_end()));

    let rest = record.strip_prefix("@@ -").ok_or_else(malformed)?;
    let (old_part, rest) = rest.split_once(" +").ok_or_else(malformed)?;
    let (new_part, _) = rest.split_once(" @@").ok_or_else(malformed)?;
    let old = parse_line_range(old_part).ok_or_else(malformed)?;
    parse_line_range(new_part).ok_or_else(malformed)?;
    Ok(old)
}

fn parse_line_range(s: &str) -> Option<(usize, usize)> {
    match s.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        // A bare number means a count of one, per the unified format.
        None => Some((s.parse().ok()?, 1)),
    }
}

//! Two-way conservative text merge.
//!
//! Reconciles two independently modified copies of the same logical text
//! without ever silently discarding content from either side. There is no
//! common-ancestor tracking: the alignment is a plain two-way line diff, and
//! conflicting regions keep both versions' lines. Duplicated text on a real
//! conflict is accepted by design; the user can see it and clean it up,
//! whereas silently dropped text is unrecoverable.

use similar::{ChangeTag, DiffTag, TextDiff};

/// Merge two diverged versions of a text, preserving every line from both.
///
/// Rules, in order:
/// - equal inputs: return either unchanged
/// - one side empty: return the other side (emptiness is treated as "no
///   information", not as an intentional deletion)
/// - otherwise, walk a line-level opcode alignment: equal spans are copied
///   once, replaced spans emit side A then side B when B differs, lines only
///   in A are kept, lines only in B are inserted at their position
/// - if the alignment step fails internally, fall back to concatenating A
///   and B outright
pub fn merge(text_a: &str, text_b: &str) -> String {
    if text_a == text_b {
        return text_a.to_string();
    }
    if text_a.is_empty() {
        return text_b.to_string();
    }
    if text_b.is_empty() {
        return text_a.to_string();
    }

    match merge_aligned(text_a, text_b) {
        Some(merged) if preserves_all_lines(&merged, text_a, text_b) => merged,
        _ => concat_fallback(text_a, text_b),
    }
}

fn merge_aligned(text_a: &str, text_b: &str) -> Option<String> {
    let diff = TextDiff::from_lines(text_a, text_b);
    let mut merged: Vec<&str> = Vec::new();

    for op in diff.ops() {
        let mut a_lines: Vec<&str> = Vec::new();
        let mut b_lines: Vec<&str> = Vec::new();
        for change in diff.iter_changes(op) {
            match change.tag() {
                ChangeTag::Equal => a_lines.push(change.value()),
                ChangeTag::Delete => a_lines.push(change.value()),
                ChangeTag::Insert => b_lines.push(change.value()),
            }
        }

        match op.tag() {
            DiffTag::Equal => merged.extend(a_lines),
            DiffTag::Delete => merged.extend(a_lines),
            DiffTag::Insert => merged.extend(b_lines),
            DiffTag::Replace => {
                // Keep both versions of a conflicting span; skip B's copy
                // only when it is textually identical to A's.
                let differ = a_lines != b_lines;
                merged.extend(a_lines);
                if differ {
                    merged.extend(b_lines);
                }
            }
        }
    }

    let mut out = String::new();
    let last = merged.len().saturating_sub(1);
    for (i, line) in merged.iter().enumerate() {
        out.push_str(line);
        // An interior line that lost its terminator to the alignment must
        // not run into the next one.
        if i < last && !line.ends_with('\n') {
            out.push('\n');
        }
    }
    Some(out)
}

/// Every distinct line of `a` and `b` must appear in `merged`.
fn preserves_all_lines(merged: &str, a: &str, b: &str) -> bool {
    let merged_lines: std::collections::HashSet<&str> =
        merged.lines().map(|l| l.trim_end_matches('\r')).collect();
    a.lines()
        .chain(b.lines())
        .all(|line| merged_lines.contains(line.trim_end_matches('\r')))
}

fn concat_fallback(a: &str, b: &str) -> String {
    let mut out = String::with_capacity(a.len() + b.len() + 1);
    out.push_str(a);
    if !a.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(b);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_identical_is_identity() {
        let text = "# Title\n\nPara one.\n";
        assert_eq!(merge(text, text), text);
    }

    #[test]
    fn test_merge_identity_on_one_sided_emptiness() {
        let text = "some content\n";
        assert_eq!(merge(text, ""), text);
        assert_eq!(merge("", text), text);
        assert_eq!(merge("", ""), "");
    }

    #[test]
    fn test_merge_keeps_lines_missing_from_other_side() {
        // B never saw the second paragraph; it must survive.
        let a = "# Title\n\nPara one.\nPara two.\n";
        let b = "# Title\n\nPara one.\n";
        let merged = merge(a, b);
        assert!(merged.contains("Para two.\n"));
        assert!(merged.contains("Para one.\n"));
    }

    #[test]
    fn test_merge_inserts_lines_only_in_b() {
        let a = "# Title\n\nPara one.\n";
        let b = "# Title\n\nPara one.\nPara three.\n";
        let merged = merge(a, b);
        assert!(merged.contains("Para three.\n"));
    }

    #[test]
    fn test_merge_conflicting_edits_keep_both_sides() {
        let a = "# Title\n\nPara one.\nPara two.\n";
        let b = "# Title\n\nPara one.\nPara three.\n";
        let merged = merge(a, b);
        assert!(merged.contains("Para two.\n"));
        assert!(merged.contains("Para three.\n"));
    }

    #[test]
    fn test_merge_preservation_law() {
        let cases = [
            ("a\nb\nc\n", "a\nB\nc\n"),
            ("one\ntwo\n", "three\nfour\n"),
            ("x\n", "x\ny\nz\n"),
            ("alpha\nbeta\ngamma\n", "beta\n"),
            ("no trailing newline", "different ending"),
        ];
        for (a, b) in cases {
            let merged = merge(a, b);
            for line in a.lines().chain(b.lines()) {
                assert!(
                    merged.lines().any(|l| l == line),
                    "line '{}' lost merging {:?} and {:?} -> {:?}",
                    line,
                    a,
                    b,
                    merged
                );
            }
        }
    }

    #[test]
    fn test_merge_equal_spans_copied_once() {
        let a = "shared\nfrom a\n";
        let b = "shared\nfrom b\n";
        let merged = merge(a, b);
        assert_eq!(merged.matches("shared\n").count(), 1);
        assert!(merged.contains("from a\n"));
        assert!(merged.contains("from b\n"));
    }

    #[test]
    fn test_concat_fallback_never_glues_lines() {
        let out = concat_fallback("a", "b\n");
        assert_eq!(out, "a\nb\n");
        let out = concat_fallback("a\n", "b\n");
        assert_eq!(out, "a\nb\n");
    }
}

//! Location model: where a comment points (file, side, line range) and the
//! deterministic first stage of matching.
//!
//! Matching rules, checked in order and short-circuiting:
//! 1. Paths must be identical when both are non-empty.
//! 2. Sides must be identical when both are present (an empty side is
//!    present).
//! 3. Line ranges must overlap or sit within the distance threshold when both
//!    ranges are complete.
//!
//! A dimension missing on either side never disqualifies a pair.

use serde::Serialize;
use tracing::debug;

use crate::model::HasLocation;

/// Default allowed gap (in lines) between two non-overlapping ranges.
pub const DEFAULT_LINE_DISTANCE_THRESHOLD: u32 = 1;

/// Normalizes a file path to forward slashes.
///
/// Escaped (`\/`) and native (`\`) backslashes both collapse to `/`;
/// `None` or `""` yields `""`.
pub fn normalize_path(path: Option<&str>) -> String {
    match path {
        Some(p) if !p.is_empty() => p.replace("\\/", "/").replace('\\', "/"),
        _ => String::new(),
    }
}

/// Whether `[s1, e1]` and `[s2, e2]` intersect or lie within `max_distance`.
///
/// The distance branch compares the two facing edges only:
/// `min(|s1 - e2|, |e1 - s2|) <= max_distance`. For well-formed ranges that is
/// the gap between them; inverted ranges (start after end) are not rejected
/// and may pass on an edge that is not the nearest one. The formula is kept as
/// is so scores stay comparable across runs.
pub fn ranges_overlap(s1: i64, e1: i64, s2: i64, e2: i64, max_distance: u32) -> bool {
    let has_overlap = !(s1 > e2 || e1 < s2);
    if has_overlap {
        return true;
    }
    let min_distance = s1.abs_diff(e2).min(e1.abs_diff(s2));
    min_distance <= u64::from(max_distance)
}

/// Structural position of a comment. Derived on demand, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentLocation {
    pub path: String,
    pub from_line: Option<i64>,
    pub to_line: Option<i64>,
    pub side: Option<String>,
}

impl CommentLocation {
    /// Extracts the location of a raw comment record.
    ///
    /// Top-level `from_line`/`to_line` take precedence over the nested
    /// `originLineRange` object; a top-level 0 counts as unset and defers to
    /// the nested value. `side` is copied verbatim: no case folding, and an
    /// empty side is a side like any other.
    ///
    /// `_is_generated` is accepted for call-site symmetry; both kinds of
    /// comment are read the same way today.
    pub fn extract<C>(comment: &C, _is_generated: bool) -> Self
    where
        C: HasLocation + ?Sized,
    {
        let raw = comment.raw_location();
        let nested_from = raw.line_range.and_then(|r| r.from_line);
        let nested_to = raw.line_range.and_then(|r| r.to_line);

        Self {
            path: normalize_path(raw.path),
            from_line: line_or_nested(raw.from_line, nested_from),
            to_line: line_or_nested(raw.to_line, nested_to),
            side: raw.side.map(str::to_string),
        }
    }
}

/// Line 0 is the dataset's "no line" marker, so it never shadows the nested range.
fn line_or_nested(top: Option<i64>, nested: Option<i64>) -> Option<i64> {
    top.filter(|&line| line != 0).or(nested)
}

/// Outcome of comparing two locations; the sub-flags say which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationMatch {
    pub is_match: bool,
    pub path_match: bool,
    pub side_match: bool,
    pub line_overlap: bool,
}

impl LocationMatch {
    fn matched() -> Self {
        Self {
            is_match: true,
            path_match: true,
            side_match: true,
            line_overlap: true,
        }
    }

    fn path_mismatch() -> Self {
        Self {
            is_match: false,
            path_match: false,
            ..Self::matched()
        }
    }

    fn side_mismatch() -> Self {
        Self {
            is_match: false,
            side_match: false,
            ..Self::matched()
        }
    }

    fn line_mismatch() -> Self {
        Self {
            is_match: false,
            line_overlap: false,
            ..Self::matched()
        }
    }

    /// Audit view attached to match records.
    pub fn details(&self) -> LocationMatchDetails {
        LocationMatchDetails {
            path_match: self.path_match,
            side_match: self.side_match,
            line_overlap: self.line_overlap,
        }
    }
}

/// Serialized sub-flags of a [`LocationMatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocationMatchDetails {
    pub path_match: bool,
    pub side_match: bool,
    pub line_overlap: bool,
}

/// Compares a generated location against a reference location.
///
/// `reference_id` is only used for debug logging.
pub fn match_location(
    generated: &CommentLocation,
    reference: &CommentLocation,
    reference_id: &str,
    max_distance: u32,
) -> LocationMatch {
    if !generated.path.is_empty() && !reference.path.is_empty() && generated.path != reference.path
    {
        debug!(reference = reference_id, "skip: path mismatch");
        return LocationMatch::path_mismatch();
    }

    if let (Some(gs), Some(rs)) = (&generated.side, &reference.side) {
        if gs != rs {
            debug!(reference = reference_id, "skip: side mismatch");
            return LocationMatch::side_mismatch();
        }
    }

    if let (Some(gf), Some(gt), Some(rf), Some(rt)) = (
        generated.from_line,
        generated.to_line,
        reference.from_line,
        reference.to_line,
    ) {
        if !ranges_overlap(gf, gt, rf, rt, max_distance) {
            debug!(reference = reference_id, "skip: line range mismatch");
            return LocationMatch::line_mismatch();
        }
    }

    LocationMatch::matched()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GeneratedComment, LineRange, ReferenceComment};

    fn loc(path: &str, side: Option<&str>, from: Option<i64>, to: Option<i64>) -> CommentLocation {
        CommentLocation {
            path: path.into(),
            from_line: from,
            to_line: to,
            side: side.map(|s| s.to_string()),
        }
    }

    #[test]
    fn overlap_branch() {
        assert!(ranges_overlap(10, 12, 12, 20, 0));
        assert!(ranges_overlap(10, 30, 15, 16, 0));
    }

    #[test]
    fn distance_branch() {
        assert!(!ranges_overlap(10, 12, 20, 22, 1));
        assert!(ranges_overlap(10, 12, 13, 15, 1));
        assert!(!ranges_overlap(10, 12, 14, 16, 1));
        assert!(ranges_overlap(10, 12, 14, 16, 2));
    }

    #[test]
    fn symmetric_under_swapping_ranges() {
        let cases = [
            (10, 12, 20, 22, 1),
            (10, 12, 13, 15, 1),
            (1, 100, 103, 104, 2),
            (5, 5, 5, 5, 0),
            (40, 41, 1, 39, 1),
        ];
        for (s1, e1, s2, e2, d) in cases {
            assert_eq!(
                ranges_overlap(s1, e1, s2, e2, d),
                ranges_overlap(s2, e2, s1, e1, d)
            );
        }
    }

    #[test]
    fn normalize_path_cases() {
        assert_eq!(normalize_path(Some("a\\b")), "a/b");
        assert_eq!(normalize_path(Some("a\\/b\\c")), "a/b/c");
        assert_eq!(normalize_path(None), "");
        assert_eq!(normalize_path(Some("")), "");
        for p in ["a\\b", "x\\/y", "plain/path.rs", "\\\\srv\\share"] {
            let once = normalize_path(Some(p));
            assert_eq!(normalize_path(Some(&once)), once);
        }
    }

    #[test]
    fn extract_prefers_top_level_lines() {
        let r = ReferenceComment {
            path: Some("src\\lib.rs".into()),
            side: Some("Right".into()),
            from_line: Some(3),
            to_line: None,
            origin_line_range: Some(LineRange {
                from_line: Some(1),
                to_line: Some(9),
            }),
            note: "n".into(),
            ..Default::default()
        };
        let l = CommentLocation::extract(&r, false);
        assert_eq!(l.path, "src/lib.rs");
        assert_eq!(l.from_line, Some(3));
        assert_eq!(l.to_line, Some(9));
        assert_eq!(l.side.as_deref(), Some("Right"));
    }

    #[test]
    fn extract_keeps_empty_side() {
        let g = GeneratedComment {
            path: "a.go".into(),
            side: Some(String::new()),
            note: "n".into(),
            ..Default::default()
        };
        assert_eq!(CommentLocation::extract(&g, true).side.as_deref(), Some(""));
    }

    #[test]
    fn empty_side_does_not_match_a_sided_reference() {
        let m = match_location(
            &loc("a.py", Some(""), Some(1), Some(1)),
            &loc("a.py", Some("right"), Some(1), Some(1)),
            "r",
            1,
        );
        assert!(!m.is_match && !m.side_match);

        let unsided = match_location(
            &loc("a.py", Some(""), Some(1), Some(1)),
            &loc("a.py", None, Some(1), Some(1)),
            "r",
            1,
        );
        assert!(unsided.is_match);
    }

    #[test]
    fn zero_top_level_line_defers_to_nested_range() {
        let r = ReferenceComment {
            from_line: Some(0),
            to_line: Some(0),
            origin_line_range: Some(LineRange {
                from_line: Some(7),
                to_line: None,
            }),
            note: "n".into(),
            ..Default::default()
        };
        let l = CommentLocation::extract(&r, false);
        assert_eq!(l.from_line, Some(7));
        assert_eq!(l.to_line, None);
    }

    #[test]
    fn extreme_line_numbers_do_not_overflow() {
        assert!(!ranges_overlap(i64::MIN, i64::MIN, i64::MAX, i64::MAX, u32::MAX));
        assert!(!ranges_overlap(i64::MAX, i64::MAX, i64::MIN, i64::MIN, 1));
        assert!(ranges_overlap(i64::MAX - 1, i64::MAX - 1, i64::MAX, i64::MAX, 1));
    }

    #[test]
    fn path_mismatch_short_circuits() {
        let m = match_location(
            &loc("a.py", Some("left"), Some(1), Some(1)),
            &loc("b.py", Some("right"), Some(50), Some(60)),
            "r",
            1,
        );
        assert!(!m.is_match);
        assert!(!m.path_match);
        assert!(m.side_match && m.line_overlap);
    }

    #[test]
    fn side_mismatch() {
        let m = match_location(
            &loc("a.py", Some("left"), Some(1), Some(1)),
            &loc("a.py", Some("right"), Some(1), Some(1)),
            "r",
            1,
        );
        assert!(!m.is_match && !m.side_match);
    }

    #[test]
    fn sides_are_case_sensitive() {
        let m = match_location(
            &loc("a.py", Some("Right"), None, None),
            &loc("a.py", Some("right"), None, None),
            "r",
            1,
        );
        assert!(!m.side_match);
    }

    #[test]
    fn line_mismatch() {
        let m = match_location(
            &loc("a.py", None, Some(10), Some(12)),
            &loc("a.py", None, Some(20), Some(22)),
            "r",
            1,
        );
        assert!(!m.is_match && !m.line_overlap);
    }

    #[test]
    fn absence_is_permissive() {
        let m = match_location(
            &loc("", None, Some(10), None),
            &loc("a.py", Some("right"), Some(500), Some(510)),
            "r",
            0,
        );
        assert_eq!(m, LocationMatch::matched());
    }
}

//! Comment records exchanged with the outside world.
//!
//! - [`GeneratedComment`] comes out of the tagged-text parser.
//! - [`ReferenceComment`] / [`PrRecord`] mirror the curated dataset JSON and
//!   are treated as read-only input.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Nested `originLineRange` object some dataset records carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    #[serde(default)]
    pub from_line: Option<i64>,
    #[serde(default)]
    pub to_line: Option<i64>,
}

/// Borrowed view of the location-bearing fields of any comment record.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawLocation<'a> {
    pub path: Option<&'a str>,
    pub side: Option<&'a str>,
    pub from_line: Option<i64>,
    pub to_line: Option<i64>,
    pub line_range: Option<&'a LineRange>,
}

/// Anything a [`crate::location::CommentLocation`] can be extracted from.
pub trait HasLocation {
    fn raw_location(&self) -> RawLocation<'_>;
}

/// One comment produced by the system under evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedComment {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub from_line: Option<i64>,
    #[serde(default)]
    pub to_line: Option<i64>,
    #[serde(default)]
    pub note: String,
}

impl GeneratedComment {
    /// Only comments with a non-empty note take part in matching.
    pub fn is_valid(&self) -> bool {
        !self.note.is_empty()
    }
}

impl HasLocation for GeneratedComment {
    fn raw_location(&self) -> RawLocation<'_> {
        RawLocation {
            path: Some(self.path.as_str()),
            side: self.side.as_deref(),
            from_line: self.from_line,
            to_line: self.to_line,
            line_range: None,
        }
    }
}

/// One curated ("good") comment from the reference dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceComment {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de_null_string")]
    pub note: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub from_line: Option<i64>,
    #[serde(default)]
    pub to_line: Option<i64>,
    #[serde(
        default,
        rename = "originLineRange",
        skip_serializing_if = "Option::is_none"
    )]
    pub origin_line_range: Option<LineRange>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub source_model: Option<String>,
    #[serde(default)]
    pub is_ai_comment: Option<bool>,
    /// Fields the evaluator does not interpret, kept for round-tripping.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReferenceComment {
    /// Only references with a non-empty note count and can be matched.
    pub fn is_valid(&self) -> bool {
        !self.note.is_empty()
    }
}

impl HasLocation for ReferenceComment {
    fn raw_location(&self) -> RawLocation<'_> {
        RawLocation {
            path: self.path.as_deref(),
            side: self.side.as_deref(),
            from_line: self.from_line,
            to_line: self.to_line,
            line_range: self.origin_line_range.as_ref(),
        }
    }
}

/// PR-level metadata used by the PR filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrMetadata {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub project_main_language: Option<String>,
}

/// One PR entry of the reference dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrRecord {
    #[serde(rename = "githubPrUrl", default)]
    pub github_pr_url: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub project_main_language: Option<String>,
    #[serde(default)]
    pub comments: Vec<ReferenceComment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PrRecord {
    pub fn metadata(&self) -> PrMetadata {
        PrMetadata {
            category: self.category.clone(),
            project_main_language: self.project_main_language.clone(),
        }
    }
}

/// Accepts string or integer ids; anything else is treated as absent.
fn de_opt_id<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn de_null_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_accepts_numeric_id_and_null_note() {
        let c: ReferenceComment = serde_json::from_str(
            r#"{"id": 42, "note": null, "path": "a.py", "from_line": 3, "to_line": 4,
                "category": "Code Defect", "reviewer": "alice"}"#,
        )
        .unwrap();
        assert_eq!(c.id.as_deref(), Some("42"));
        assert_eq!(c.note, "");
        assert!(!c.is_valid());
        assert_eq!(c.extra.get("reviewer"), Some(&Value::from("alice")));
    }

    #[test]
    fn reference_reads_nested_line_range() {
        let c: ReferenceComment = serde_json::from_str(
            r#"{"note": "x", "originLineRange": {"from_line": 7, "to_line": 9}}"#,
        )
        .unwrap();
        let raw = c.raw_location();
        assert_eq!(raw.from_line, None);
        assert_eq!(raw.line_range.and_then(|r| r.to_line), Some(9));
    }

    #[test]
    fn pr_record_metadata() {
        let pr: PrRecord = serde_json::from_str(
            r#"{"githubPrUrl": "https://github.com/o/r/pull/1", "category": "Bug Fix",
                "project_main_language": "Go", "comments": [], "source_commit": "abc"}"#,
        )
        .unwrap();
        let meta = pr.metadata();
        assert_eq!(meta.category.as_deref(), Some("Bug Fix"));
        assert_eq!(meta.project_main_language.as_deref(), Some("Go"));
        assert!(pr.extra.contains_key("source_commit"));
    }
}

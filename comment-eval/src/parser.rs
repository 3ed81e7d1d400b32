//! Parser for the tagged comment artifact written by the review agent.
//!
//! Format (any tag may span multiple lines):
//!
//! ```text
//! <path>src/lib.rs</path>
//! <side>right</side>
//! <from>10</from>
//! <to>12</to>
//! <note>Handle the error instead of unwrapping.</note>
//! <notesplit />
//! ```
//!
//! Blocks are separated by `<notesplit/>` or `<notesplit>...</notesplit>`
//! (case-insensitive). A block yields a comment only when it carries a
//! non-empty `<note>`; every other field is optional. Bad blocks are logged
//! and skipped, never fatal.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::errors::EvalResult;
use crate::model::GeneratedComment;

fn split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</?notesplit\s*/?>").expect("valid notesplit regex"))
}

/// Compiled `<tag>(.*?)</tag>` matchers, one per supported field.
struct TagRegexes {
    path: Regex,
    side: Regex,
    from: Regex,
    to: Regex,
    note: Regex,
}

fn tag_res() -> &'static TagRegexes {
    static RES: OnceLock<TagRegexes> = OnceLock::new();
    RES.get_or_init(|| {
        let tag = |name: &str| {
            Regex::new(&format!(r"(?s)<{name}>(.*?)</{name}>")).expect("valid tag regex")
        };
        TagRegexes {
            path: tag("path"),
            side: tag("side"),
            from: tag("from"),
            to: tag("to"),
            note: tag("note"),
        }
    })
}

/// Why a block was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BlockError {
    /// `<tag>` opened but never closed.
    Unclosed(&'static str),
}

impl std::fmt::Display for BlockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockError::Unclosed(tag) => write!(f, "<{tag}> is not closed"),
        }
    }
}

/// Parses the whole artifact into comments, in input order.
pub fn parse_generated_comments(text: &str) -> Vec<GeneratedComment> {
    let mut out = Vec::new();
    if text.trim().is_empty() {
        return out;
    }

    for (idx, block) in split_re().split(text).enumerate() {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        match parse_block(block) {
            Ok(Some(c)) => out.push(c),
            Ok(None) => debug!(block = idx, "block without note skipped"),
            Err(e) => warn!(block = idx, error = %e, "failed to parse comment block"),
        }
    }
    out
}

/// Reads a comment artifact from disk and parses it.
///
/// # Errors
/// Only I/O failures (missing file, invalid UTF-8) are reported.
pub async fn load_generated_comments_from_file(path: impl AsRef<Path>) -> EvalResult<Vec<GeneratedComment>> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    let comments = parse_generated_comments(&text);
    debug!(
        file = %path.as_ref().display(),
        comments = comments.len(),
        "generated comments loaded"
    );
    Ok(comments)
}

fn parse_block(block: &str) -> Result<Option<GeneratedComment>, BlockError> {
    let res = tag_res();

    let Some(note) = capture(&res.note, block) else {
        if block.contains("<note>") {
            return Err(BlockError::Unclosed("note"));
        }
        return Ok(None);
    };
    if note.is_empty() {
        return Ok(None);
    }

    // A block without `<side>` still carries a side: the empty one.
    let side = capture(&res.side, block).unwrap_or_default();

    Ok(Some(GeneratedComment {
        path: capture(&res.path, block).unwrap_or_default(),
        side: Some(side),
        from_line: capture(&res.from, block).and_then(|v| parse_line(&v)),
        to_line: capture(&res.to, block).and_then(|v| parse_line(&v)),
        note,
    }))
}

/// First capture of `re` in `block`, trimmed.
fn capture(re: &Regex, block: &str) -> Option<String> {
    re.captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Non-numeric line values degrade to "absent".
fn parse_line(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_well_formed_block() {
        let text = "<path>f.go</path><side>right</side><from>5</from><to>7</to><note>fix this</note>";
        let out = parse_generated_comments(text);
        assert_eq!(
            out,
            vec![GeneratedComment {
                path: "f.go".into(),
                side: Some("right".into()),
                from_line: Some(5),
                to_line: Some(7),
                note: "fix this".into(),
            }]
        );
    }

    #[test]
    fn missing_or_empty_note_yields_nothing() {
        assert!(parse_generated_comments("<path>a.rs</path><from>1</from>").is_empty());
        assert!(parse_generated_comments("<path>a.rs</path><note>   \n </note>").is_empty());
        assert!(parse_generated_comments("   \n").is_empty());
    }

    #[test]
    fn non_numeric_line_degrades_to_none() {
        let out = parse_generated_comments("<from>abc</from><to>9</to><note>n</note>");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].from_line, None);
        assert_eq!(out[0].to_line, Some(9));
        assert_eq!(out[0].path, "");
        assert_eq!(out[0].side.as_deref(), Some(""));
    }

    #[test]
    fn splits_on_all_delimiter_spellings() {
        let text = "\
<path>a.py</path>
<note>first</note>
<notesplit />
<path>b.py</path>
<note>second
spans lines</note>
<NoteSplit/>
<note>third</note>
<notesplit>
<note>fourth</note>
</notesplit>";
        let out = parse_generated_comments(text);
        let notes: Vec<&str> = out.iter().map(|c| c.note.as_str()).collect();
        assert_eq!(notes, ["first", "second\nspans lines", "third", "fourth"]);
        assert_eq!(out[1].path, "b.py");
    }

    #[test]
    fn bad_block_does_not_stop_parsing() {
        let text = "<note>unterminated<notesplit/><note>ok</note>";
        let out = parse_generated_comments(text);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].note, "ok");
    }

    #[test]
    fn missing_side_tag_yields_empty_side() {
        let out = parse_generated_comments("<path>a.py</path><from>1</from><to>1</to><note>x</note>");
        assert_eq!(out[0].side.as_deref(), Some(""));
        let out = parse_generated_comments("<side>  </side><note>x</note>");
        assert_eq!(out[0].side.as_deref(), Some(""));
    }

    #[test]
    fn side_is_not_case_folded() {
        let out = parse_generated_comments("<side> LEFT </side><note>n</note>");
        assert_eq!(out[0].side.as_deref(), Some("LEFT"));
    }

    #[tokio::test]
    async fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comments_repo_1.txt");
        tokio::fs::write(&path, "<path>x\\y.rs</path><note>n</note><notesplit/>")
            .await
            .unwrap();
        let out = load_generated_comments_from_file(&path).await.unwrap();
        assert_eq!(out.len(), 1);
        // Path normalization happens at location extraction, not here.
        assert_eq!(out[0].path, "x\\y.rs");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            load_generated_comments_from_file(dir.path().join("nope.txt"))
                .await
                .is_err()
        );
    }
}

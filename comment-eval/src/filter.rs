//! Declarative inclusion rules.
//!
//! PR-level lists (`pr_categories`, `project_languages`) decide whether a PR
//! is evaluated at all. Comment-level lists (`comment_categories`,
//! `comment_contexts`) narrow the reference pool before matching. An empty
//! list never constrains; a non-empty list requires the value to be present
//! and listed (exact, case-sensitive comparison).

use serde::{Deserialize, Serialize};

use crate::model::{PrMetadata, ReferenceComment};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub pr_categories: Vec<String>,
    #[serde(default)]
    pub project_languages: Vec<String>,
    #[serde(default)]
    pub comment_categories: Vec<String>,
    #[serde(default)]
    pub comment_contexts: Vec<String>,
}

/// PR-level part of a filter, echoed in skipped results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrFilterView {
    pub pr_categories: Vec<String>,
    pub project_languages: Vec<String>,
}

fn to_strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values.into_iter().map(|v| v.as_ref().to_string()).collect()
}

/// `value` passes when `allowed` is empty or contains it.
fn admits(allowed: &[String], value: Option<&str>) -> bool {
    allowed.is_empty() || value.is_some_and(|v| allowed.iter().any(|a| a == v))
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts plain strings or the vocabulary enums in [`crate::config`].
    pub fn with_pr_categories<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.pr_categories = to_strings(values);
        self
    }

    pub fn with_project_languages<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.project_languages = to_strings(values);
        self
    }

    pub fn with_comment_categories<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.comment_categories = to_strings(values);
        self
    }

    pub fn with_comment_contexts<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.comment_contexts = to_strings(values);
        self
    }

    pub fn has_pr_filter(&self) -> bool {
        !self.pr_categories.is_empty() || !self.project_languages.is_empty()
    }

    pub fn has_comment_filter(&self) -> bool {
        !self.comment_categories.is_empty() || !self.comment_contexts.is_empty()
    }

    /// True when no list constrains anything.
    pub fn is_empty(&self) -> bool {
        !self.has_pr_filter() && !self.has_comment_filter()
    }

    pub fn match_pr(&self, pr: &PrMetadata) -> bool {
        admits(&self.pr_categories, pr.category.as_deref())
            && admits(&self.project_languages, pr.project_main_language.as_deref())
    }

    pub fn match_comment(&self, comment: &ReferenceComment) -> bool {
        admits(&self.comment_categories, comment.category.as_deref())
            && admits(&self.comment_contexts, comment.context.as_deref())
    }

    /// Keeps the comments that pass the comment-level lists, in order.
    pub fn filter_comments(&self, comments: &[ReferenceComment]) -> Vec<ReferenceComment> {
        if !self.has_comment_filter() {
            return comments.to_vec();
        }
        comments
            .iter()
            .filter(|c| self.match_comment(c))
            .cloned()
            .collect()
    }

    pub fn pr_view(&self) -> PrFilterView {
        PrFilterView {
            pr_categories: self.pr_categories.clone(),
            project_languages: self.project_languages.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(category: Option<&str>, context: Option<&str>) -> ReferenceComment {
        ReferenceComment {
            note: "n".into(),
            category: category.map(str::to_string),
            context: context.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn empty_filter_admits_everything() {
        let f = FilterConfig::new();
        assert!(f.is_empty());
        assert!(f.match_pr(&PrMetadata::default()));
        assert!(f.match_comment(&comment(None, None)));
    }

    #[test]
    fn pr_filter_requires_listed_value() {
        let f = FilterConfig::new()
            .with_pr_categories(["Bug Fix"])
            .with_project_languages(["Go", "Rust"]);
        let pr = |cat: Option<&str>, lang: Option<&str>| PrMetadata {
            category: cat.map(str::to_string),
            project_main_language: lang.map(str::to_string),
        };
        assert!(f.match_pr(&pr(Some("Bug Fix"), Some("Rust"))));
        assert!(!f.match_pr(&pr(Some("Bug Fix"), Some("Python"))));
        assert!(!f.match_pr(&pr(None, Some("Go"))));
        assert!(!f.match_pr(&pr(Some("bug fix"), Some("Go"))));
    }

    #[test]
    fn comment_filter_narrows_in_order() {
        let f = FilterConfig::new()
            .with_comment_categories(["Code Defect", "Security Vulnerability"])
            .with_comment_contexts(["Diff Level"]);
        let pool = vec![
            comment(Some("Code Defect"), Some("Diff Level")),
            comment(Some("Performance"), Some("Diff Level")),
            comment(Some("Security Vulnerability"), Some("Diff Level")),
            comment(Some("Code Defect"), Some("Repo Level")),
            comment(None, Some("Diff Level")),
        ];
        let kept = f.filter_comments(&pool);
        assert_eq!(kept, vec![pool[0].clone(), pool[2].clone()]);
    }

    #[test]
    fn filter_comments_is_idempotent() {
        let f = FilterConfig::new().with_comment_contexts(["File Level"]);
        let pool = vec![
            comment(None, Some("File Level")),
            comment(None, Some("Repo Level")),
            comment(Some("Performance"), Some("File Level")),
        ];
        let once = f.filter_comments(&pool);
        assert_eq!(f.filter_comments(&once), once);
    }

    #[test]
    fn pr_lists_do_not_touch_comments() {
        let f = FilterConfig::new().with_pr_categories(["Bug Fix"]);
        assert!(f.has_pr_filter());
        assert!(!f.has_comment_filter());
        let pool = vec![comment(None, None)];
        assert_eq!(f.filter_comments(&pool), pool);
    }
}

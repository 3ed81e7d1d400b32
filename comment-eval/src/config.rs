//! Evaluation policy and the dataset vocabularies.
//!
//! [`EvaluatorConfig`] is immutable once built. It can be assembled in code
//! or read from the environment:
//!
//! | Var | Default |
//! |---|---|
//! | `EVAL_LINE_DISTANCE_THRESHOLD` | `1` (negative rejected) |
//! | `EVAL_SEMANTIC_MATCHER` | `llm` (`llm` or `embedding`) |
//! | `EVAL_ENABLE_SEMANTIC_MATCH` | `true` |
//! | `EVAL_FILTER_PR_CATEGORIES` | unset (comma-separated) |
//! | `EVAL_FILTER_PROJECT_LANGUAGES` | unset |
//! | `EVAL_FILTER_COMMENT_CATEGORIES` | unset |
//! | `EVAL_FILTER_COMMENT_CONTEXTS` | unset |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, EvalResult};
use crate::filter::FilterConfig;
use crate::location::DEFAULT_LINE_DISTANCE_THRESHOLD;

/// Which classifier backend performs semantic matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticMatcherType {
    #[default]
    Llm,
    Embedding,
}

impl SemanticMatcherType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Embedding => "embedding",
        }
    }
}

impl fmt::Display for SemanticMatcherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticMatcherType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "llm" => Ok(Self::Llm),
            "embedding" => Ok(Self::Embedding),
            other => Err(ConfigError::UnknownMatcherType(other.to_string())),
        }
    }
}

/// Per-run matching policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorConfig {
    line_distance_threshold: u32,
    semantic_matcher_type: SemanticMatcherType,
    enable_semantic_match: bool,
    filter: Option<FilterConfig>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            line_distance_threshold: DEFAULT_LINE_DISTANCE_THRESHOLD,
            semantic_matcher_type: SemanticMatcherType::Llm,
            enable_semantic_match: true,
            filter: None,
        }
    }
}

fn checked_threshold(value: i64) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| ConfigError::NegativeLineThreshold(value))
}

impl EvaluatorConfig {
    /// # Errors
    /// [`ConfigError::NegativeLineThreshold`] for a negative threshold.
    pub fn new(
        line_distance_threshold: i64,
        semantic_matcher_type: SemanticMatcherType,
        enable_semantic_match: bool,
        filter: Option<FilterConfig>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            line_distance_threshold: checked_threshold(line_distance_threshold)?,
            semantic_matcher_type,
            enable_semantic_match,
            filter,
        })
    }

    pub fn with_embedding(line_distance_threshold: i64) -> Result<Self, ConfigError> {
        Self::new(
            line_distance_threshold,
            SemanticMatcherType::Embedding,
            true,
            None,
        )
    }

    /// Location matching only; no classifier is ever called.
    pub fn location_only(line_distance_threshold: i64) -> Result<Self, ConfigError> {
        Self::new(line_distance_threshold, SemanticMatcherType::Llm, false, None)
    }

    /// Default policy plus `filter`.
    pub fn with_filter(filter: FilterConfig) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn from_env() -> EvalResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> EvalResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let threshold = parse_or(
            "EVAL_LINE_DISTANCE_THRESHOLD",
            lookup("EVAL_LINE_DISTANCE_THRESHOLD"),
            i64::from(DEFAULT_LINE_DISTANCE_THRESHOLD),
        )?;
        let matcher = match non_empty(lookup("EVAL_SEMANTIC_MATCHER")) {
            Some(v) => v.parse::<SemanticMatcherType>()?,
            None => SemanticMatcherType::default(),
        };
        let enable = parse_bool(
            "EVAL_ENABLE_SEMANTIC_MATCH",
            lookup("EVAL_ENABLE_SEMANTIC_MATCH"),
            true,
        )?;

        let filter = FilterConfig::new()
            .with_pr_categories(split_list(lookup("EVAL_FILTER_PR_CATEGORIES")))
            .with_project_languages(split_list(lookup("EVAL_FILTER_PROJECT_LANGUAGES")))
            .with_comment_categories(split_list(lookup("EVAL_FILTER_COMMENT_CATEGORIES")))
            .with_comment_contexts(split_list(lookup("EVAL_FILTER_COMMENT_CONTEXTS")));
        let filter = (!filter.is_empty()).then_some(filter);

        Ok(Self::new(threshold, matcher, enable, filter)?)
    }

    pub fn line_distance_threshold(&self) -> u32 {
        self.line_distance_threshold
    }

    pub fn semantic_matcher_type(&self) -> SemanticMatcherType {
        self.semantic_matcher_type
    }

    pub fn enable_semantic_match(&self) -> bool {
        self.enable_semantic_match
    }

    pub fn filter(&self) -> Option<&FilterConfig> {
        self.filter.as_ref()
    }

    /// Serializable echo stored in every full result.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            line_distance_threshold: self.line_distance_threshold,
            semantic_matcher_type: self.semantic_matcher_type,
            enable_semantic_match: self.enable_semantic_match,
        }
    }
}

/// Policy echo of a full evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub line_distance_threshold: u32,
    pub semantic_matcher_type: SemanticMatcherType,
    pub enable_semantic_match: bool,
}

/* ------------------------------------------------------------------------- */
/* Env parsing helpers                                                       */
/* ------------------------------------------------------------------------- */

pub(crate) fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parses `raw` or falls back to `default` when unset/blank.
pub(crate) fn parse_or<T: FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match non_empty(raw) {
        Some(v) => v.parse::<T>().map_err(|_| ConfigError::InvalidValue {
            var,
            reason: "not a valid number",
        }),
        None => Ok(default),
    }
}

fn parse_bool(var: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match non_empty(raw).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                var,
                reason: "expected true or false",
            }),
        },
    }
}

/// Comma-separated list; blanks are dropped.
fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/* ------------------------------------------------------------------------- */
/* Dataset vocabularies                                                      */
/* ------------------------------------------------------------------------- */

macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

vocabulary! {
    /// PR categories used in the reference dataset.
    PrCategory {
        BugFix => "Bug Fix",
        Refactoring => "Code Refactoring / Architectural Improvement",
        NewFeature => "New Feature Additions",
        Performance => "Performance Optimizations",
        Security => "Security Patches / Vulnerability Fixes",
        Documentation => "Documentation Update",
        CodeStyle => "Code Style, Linting, Formatting Fixes",
        TestCi => "Test Suite / CI Enhancements",
        Dependency => "Dependency Updates & Environment Compatibility",
    }
}

vocabulary! {
    ProjectLanguage {
        Python => "Python",
        Java => "Java",
        JavaScript => "JavaScript",
        TypeScript => "TypeScript",
        Go => "Go",
        Rust => "Rust",
        C => "C",
        Cpp => "C++",
        CSharp => "C#",
        Php => "PHP",
    }
}

vocabulary! {
    CommentCategory {
        CodeDefect => "Code Defect",
        Maintainability => "Maintainability and Readability",
        Performance => "Performance",
        Security => "Security Vulnerability",
    }
}

vocabulary! {
    /// How much surrounding code a reviewer needed to raise the comment.
    CommentContext {
        DiffLevel => "Diff Level",
        FileLevel => "File Level",
        RepoLevel => "Repo Level",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn negative_threshold_is_rejected() {
        assert!(matches!(
            EvaluatorConfig::new(-1, SemanticMatcherType::Llm, true, None),
            Err(ConfigError::NegativeLineThreshold(-1))
        ));
        assert!(EvaluatorConfig::location_only(-3).is_err());
        assert_eq!(
            EvaluatorConfig::new(0, SemanticMatcherType::Llm, true, None)
                .unwrap()
                .line_distance_threshold(),
            0
        );
    }

    #[test]
    fn convenience_constructors() {
        let d = EvaluatorConfig::default();
        assert_eq!(d.line_distance_threshold(), 1);
        assert!(d.enable_semantic_match());
        assert_eq!(d.semantic_matcher_type(), SemanticMatcherType::Llm);

        let e = EvaluatorConfig::with_embedding(2).unwrap();
        assert_eq!(e.semantic_matcher_type(), SemanticMatcherType::Embedding);
        assert_eq!(e.line_distance_threshold(), 2);

        assert!(!EvaluatorConfig::location_only(1).unwrap().enable_semantic_match());

        let f = EvaluatorConfig::with_filter(
            FilterConfig::new().with_pr_categories([PrCategory::BugFix]),
        );
        assert_eq!(f.filter().unwrap().pr_categories, vec!["Bug Fix".to_string()]);
    }

    #[test]
    fn matcher_type_parsing() {
        assert_eq!("LLM".parse::<SemanticMatcherType>().unwrap(), SemanticMatcherType::Llm);
        assert_eq!(
            " embedding ".parse::<SemanticMatcherType>().unwrap(),
            SemanticMatcherType::Embedding
        );
        assert!("bert".parse::<SemanticMatcherType>().is_err());
        assert_eq!(
            serde_json::to_string(&SemanticMatcherType::Embedding).unwrap(),
            "\"embedding\""
        );
    }

    #[test]
    fn from_lookup_defaults() {
        let cfg = EvaluatorConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(cfg, EvaluatorConfig::default());
    }

    #[test]
    fn from_lookup_reads_everything() {
        let cfg = EvaluatorConfig::from_lookup(lookup_from(&[
            ("EVAL_LINE_DISTANCE_THRESHOLD", "3"),
            ("EVAL_SEMANTIC_MATCHER", "embedding"),
            ("EVAL_ENABLE_SEMANTIC_MATCH", "false"),
            ("EVAL_FILTER_PROJECT_LANGUAGES", "Go, Rust,,"),
            ("EVAL_FILTER_COMMENT_CONTEXTS", "Diff Level"),
        ]))
        .unwrap();
        assert_eq!(cfg.line_distance_threshold(), 3);
        assert_eq!(cfg.semantic_matcher_type(), SemanticMatcherType::Embedding);
        assert!(!cfg.enable_semantic_match());
        let f = cfg.filter().unwrap();
        assert_eq!(f.project_languages, vec!["Go".to_string(), "Rust".to_string()]);
        assert_eq!(f.comment_contexts, vec!["Diff Level".to_string()]);
        assert!(f.pr_categories.is_empty());
    }

    #[test]
    fn from_lookup_rejects_bad_values() {
        let neg = EvaluatorConfig::from_lookup(lookup_from(&[("EVAL_LINE_DISTANCE_THRESHOLD", "-2")]));
        assert!(matches!(
            neg,
            Err(Error::Config(ConfigError::NegativeLineThreshold(-2)))
        ));
        let nan = EvaluatorConfig::from_lookup(lookup_from(&[("EVAL_LINE_DISTANCE_THRESHOLD", "x")]));
        assert!(matches!(nan, Err(Error::Config(ConfigError::InvalidValue { .. }))));
        let kind = EvaluatorConfig::from_lookup(lookup_from(&[("EVAL_SEMANTIC_MATCHER", "bm25")]));
        assert!(matches!(
            kind,
            Err(Error::Config(ConfigError::UnknownMatcherType(_)))
        ));
    }

    #[test]
    fn vocabularies_render_dataset_strings() {
        assert_eq!(PrCategory::BugFix.as_str(), "Bug Fix");
        assert_eq!(ProjectLanguage::Cpp.as_str(), "C++");
        assert_eq!(CommentCategory::Security.to_string(), "Security Vulnerability");
        assert_eq!(CommentContext::ALL.len(), 3);
    }
}

//! Per-PR evaluation: filtering, matching, rates and the serializable result.
//!
//! [`evaluate`] never fails. Every call yields exactly one
//! [`EvaluationOutcome`]: a full report, a filter skip, or `{ "error": .. }`,
//! so one broken PR cannot stop a batch.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::OnceLock;
use std::time::Instant;

use futures::FutureExt;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::{ConfigSummary, EvaluatorConfig};
use crate::engine::{MatchRecord, MatchStatistics, ReferenceDetails, match_all};
use crate::errors::EvalResult;
use crate::filter::{FilterConfig, PrFilterView};
use crate::location::CommentLocation;
use crate::matcher::SemanticMatcher;
use crate::model::{GeneratedComment, PrMetadata, ReferenceComment};

/// Reason reported for PRs rejected by the PR-level filter.
pub const SKIP_REASON_FILTER: &str = "PR does not match filter criteria";

/// `owner`, `repo` and `pr_number` of a GitHub PR URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrUrlParts {
    pub owner: String,
    pub repo: String,
    pub pr_number: String,
}

fn pr_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https://github\.com/([^/]+)/([^/]+)/pull/(\d+)").expect("valid PR url regex")
    })
}

/// Splits a PR URL; anything unparseable yields empty parts.
pub fn parse_github_pr_url(url: &str) -> PrUrlParts {
    pr_url_re()
        .captures(url)
        .map(|c| PrUrlParts {
            owner: c[1].to_string(),
            repo: c[2].to_string(),
            pr_number: c[3].to_string(),
        })
        .unwrap_or_default()
}

/// `"{repo}_{pr_number}"`, or `"_"` when the URL cannot be parsed.
pub fn evaluation_id(url: &str) -> String {
    let parts = parse_github_pr_url(url);
    format!("{}_{}", parts.repo, parts.pr_number)
}

/// `numerator / denominator` rounded to 3 decimals; 0 for an empty denominator.
pub fn rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round_to(numerator as f64 / denominator as f64, 3)
}

/// Rounds `value` to `decimals` places (at most 19). Ties are decided on the
/// exact binary value of the float and go to the even digit, so `1/16`
/// becomes `0.062`, the same figure Python's `round` reports.
pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return value;
    }
    let scale = 10u64.pow(decimals);

    // |value| == mantissa / 2^shift exactly.
    let bits = value.abs().to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, shift) = if exponent == 0 {
        (fraction, 1074)
    } else {
        (fraction | (1u64 << 52), 1075 - exponent)
    };
    if shift <= 0 {
        return value;
    }

    let scaled = u128::from(mantissa) * u128::from(scale);
    let rounded = if shift >= 128 {
        0
    } else {
        let shift = shift as u32;
        let whole = scaled >> shift;
        let rem = scaled & ((1u128 << shift) - 1);
        let half = 1u128 << (shift - 1);
        if rem > half || (rem == half && whole & 1 == 1) {
            whole + 1
        } else {
            whole
        }
    };
    (rounded as f64 / scale as f64).copysign(value)
}

/// A reference that earned a semantic credit, and who earned it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedReference {
    pub reference_comment_id: Option<String>,
    pub reference_note: Option<String>,
    pub reference_location: Option<CommentLocation>,
    pub reference_details: Option<ReferenceDetails>,
    pub matched_by_generated_index: usize,
    pub matched_by_generated_note: String,
}

/// Classifier evidence of one semantic match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmComparison {
    pub generated_comment_index: usize,
    pub generated_note: String,
    pub reference_comment_id: Option<String>,
    pub reference_note: Option<String>,
    pub is_similar: bool,
    pub llm_response: Option<String>,
}

/// Full result of one PR. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub github_pr_url: String,
    pub owner: String,
    pub repo: String,
    pub pr_number: String,
    pub evaluation_id: String,
    pub config: ConfigSummary,

    pub positive_expected_nums: usize,
    pub total_generated_nums: usize,
    pub positive_match_nums: usize,
    pub positive_line_match_nums: usize,
    pub unmatched_nums: usize,

    pub positive_match_rate: f64,
    pub positive_recall_rate: f64,
    pub positive_line_match_rate: f64,
    pub positive_line_recall_rate: f64,
    pub unmatched_rate: f64,

    pub match_details: Vec<MatchRecord>,
    pub matched_reference_comments: Vec<MatchedReference>,
    pub llm_comparisons: Vec<LlmComparison>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_config: Option<FilterConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_good_comments_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_good_comments_count: Option<usize>,
}

/// Result of a PR rejected by the PR-level filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedReport {
    pub github_pr_url: String,
    pub evaluation_id: String,
    pub skipped: bool,
    pub skip_reason: String,
    pub filter_config: PrFilterView,
}

/// One of the three result shapes; serialized without a tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EvaluationOutcome {
    Evaluated(Box<EvaluationReport>),
    Skipped(SkippedReport),
    Failed { error: String },
}

impl EvaluationOutcome {
    pub fn report(&self) -> Option<&EvaluationReport> {
        match self {
            Self::Evaluated(r) => Some(r.as_ref()),
            _ => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error.as_str()),
            _ => None,
        }
    }
}

/// Evaluates one PR.
///
/// - `pr_metadata` feeds the PR-level filter; without it that filter is not
///   applied.
/// - `matcher` is required when semantic matching is enabled.
///
/// Errors and panics inside the evaluation are logged and returned as
/// [`EvaluationOutcome::Failed`].
pub async fn evaluate<M>(
    pr_url: &str,
    generated: &[GeneratedComment],
    good: &[ReferenceComment],
    config: &EvaluatorConfig,
    pr_metadata: Option<&PrMetadata>,
    matcher: Option<&M>,
) -> EvaluationOutcome
where
    M: SemanticMatcher,
{
    let run = try_evaluate(pr_url, generated, good, config, pr_metadata, matcher);
    match AssertUnwindSafe(run).catch_unwind().await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            error!(pr = %pr_url, error = %e, "evaluation failed");
            EvaluationOutcome::Failed {
                error: e.to_string(),
            }
        }
        Err(panic) => {
            let msg = panic_message(panic.as_ref());
            error!(pr = %pr_url, error = %msg, "evaluation panicked");
            EvaluationOutcome::Failed { error: msg }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "evaluation panicked".to_string()
    }
}

async fn try_evaluate<M>(
    pr_url: &str,
    generated: &[GeneratedComment],
    good: &[ReferenceComment],
    config: &EvaluatorConfig,
    pr_metadata: Option<&PrMetadata>,
    matcher: Option<&M>,
) -> EvalResult<EvaluationOutcome>
where
    M: SemanticMatcher,
{
    let started = Instant::now();
    let parts = parse_github_pr_url(pr_url);
    let evaluation_id = evaluation_id(pr_url);
    let filter = config.filter();

    if let (Some(f), Some(meta)) = (filter, pr_metadata) {
        if f.has_pr_filter() && !f.match_pr(meta) {
            info!(pr = %pr_url, "skipped by PR filter");
            return Ok(EvaluationOutcome::Skipped(SkippedReport {
                github_pr_url: pr_url.to_string(),
                evaluation_id,
                skipped: true,
                skip_reason: SKIP_REASON_FILTER.to_string(),
                filter_config: f.pr_view(),
            }));
        }
    }

    let narrowed = filter
        .filter(|f| f.has_comment_filter())
        .map(|f| f.filter_comments(good));
    let pool = narrowed.as_deref().unwrap_or(good);
    if let Some(kept) = &narrowed {
        debug!(pr = %pr_url, before = good.len(), after = kept.len(), "comment filter applied");
    }

    let stats = match_all(generated, pool, config, matcher).await?;

    let counts = narrowed.as_ref().map(|kept| (good.len(), kept.len()));
    let report = build_report(pr_url, parts, evaluation_id, config, stats, counts);
    info!(
        pr = %pr_url,
        generated = report.total_generated_nums,
        expected = report.positive_expected_nums,
        matched = report.positive_match_nums,
        line_matched = report.positive_line_match_nums,
        recall = report.positive_recall_rate,
        latency_ms = started.elapsed().as_millis(),
        "PR evaluated"
    );
    Ok(EvaluationOutcome::Evaluated(Box::new(report)))
}

fn build_report(
    pr_url: &str,
    parts: PrUrlParts,
    evaluation_id: String,
    config: &EvaluatorConfig,
    stats: MatchStatistics,
    filter_counts: Option<(usize, usize)>,
) -> EvaluationReport {
    let expected = stats.total_good;
    let generated = stats.total_generated;

    let matched_reference_comments = stats
        .match_details
        .iter()
        .filter(|r| r.semantic_match)
        .map(|r| MatchedReference {
            reference_comment_id: r.matched_reference_id.clone(),
            reference_note: r.matched_reference_note.clone(),
            reference_location: r.matched_reference_location.clone(),
            reference_details: r.matched_reference_details.clone(),
            matched_by_generated_index: r.generated_comment_index,
            matched_by_generated_note: r.generated_comment.clone(),
        })
        .collect();

    let llm_comparisons = stats
        .match_details
        .iter()
        .filter_map(|r| {
            r.llm_comparison.as_ref().map(|v| LlmComparison {
                generated_comment_index: r.generated_comment_index,
                generated_note: r.generated_comment.clone(),
                reference_comment_id: r.matched_reference_id.clone(),
                reference_note: r.matched_reference_note.clone(),
                is_similar: v.is_similar,
                llm_response: v.raw_response.clone(),
            })
        })
        .collect();

    let filter_config = config.filter().cloned();
    let original_good_comments_count = filter_counts.map(|(before, _)| before);
    let filtered_good_comments_count = filter_counts.map(|(_, after)| after);

    EvaluationReport {
        github_pr_url: pr_url.to_string(),
        owner: parts.owner,
        repo: parts.repo,
        pr_number: parts.pr_number,
        evaluation_id,
        config: config.summary(),

        positive_expected_nums: expected,
        total_generated_nums: generated,
        positive_match_nums: stats.positive_matches,
        positive_line_match_nums: stats.positive_line_matches,
        unmatched_nums: stats.unmatched_count,

        positive_match_rate: rate(stats.positive_matches, generated),
        positive_recall_rate: rate(stats.positive_matches, expected),
        positive_line_match_rate: rate(stats.positive_line_matches, generated),
        positive_line_recall_rate: rate(stats.positive_line_matches, expected),
        unmatched_rate: rate(stats.unmatched_count, generated),

        match_details: stats.match_details,
        matched_reference_comments,
        llm_comparisons,

        filter_config,
        original_good_comments_count,
        filtered_good_comments_count,
    }
}

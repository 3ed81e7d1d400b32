//! Match engine: two-stage matching of one PR's generated comments against
//! its reference pool.
//!
//! For every valid generated comment, in input order, references are scanned
//! in their given order (first fit, no ranking):
//!
//! 1. Location gate ([`match_location`]); a mismatch moves on.
//! 2. Line credit: the first generated comment to reach a reference by
//!    location consumes its line credit.
//! 3. Semantic credit: if the reference's semantic credit is still free, the
//!    classifier is asked; the first positive verdict consumes the credit and
//!    ends the scan for this generated comment.
//!
//! Line and semantic credits of one reference are tracked independently and
//! may go to different generated comments. The scan is strictly sequential:
//! credit checks and updates never interleave with another comment's scan.

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::EvaluatorConfig;
use crate::errors::{Error, EvalResult};
use crate::location::{CommentLocation, LocationMatch, LocationMatchDetails, match_location};
use crate::matcher::{SemanticMatcher, Verdict};
use crate::model::{GeneratedComment, ReferenceComment};

/// Snapshot of the reference fields reported alongside a match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceDetails {
    pub from_line: Option<i64>,
    pub to_line: Option<i64>,
    pub category: Option<String>,
    pub context: Option<String>,
    pub source_model: Option<String>,
    pub is_ai_comment: Option<bool>,
}

impl From<&ReferenceComment> for ReferenceDetails {
    fn from(c: &ReferenceComment) -> Self {
        Self {
            from_line: c.from_line,
            to_line: c.to_line,
            category: c.category.clone(),
            context: c.context.clone(),
            source_model: c.source_model.clone(),
            is_ai_comment: c.is_ai_comment,
        }
    }
}

/// Audit trail of one generated comment.
///
/// `matched_reference_*` describe the last reference that credited the
/// record; a semantic match overwrites a line match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    /// 1-based position in the input list (invalid entries count too).
    pub generated_comment_index: usize,
    pub generated_comment: String,
    pub generated_location: CommentLocation,
    pub line_match: bool,
    pub semantic_match: bool,
    pub line_matched_reference_id: Option<String>,
    pub semantic_matched_reference_id: Option<String>,
    pub matched_reference_id: Option<String>,
    pub matched_reference_note: Option<String>,
    pub matched_reference_location: Option<CommentLocation>,
    pub matched_reference_details: Option<ReferenceDetails>,
    pub location_match_details: Option<LocationMatchDetails>,
    pub llm_comparison: Option<Verdict>,
}

impl MatchRecord {
    fn new(index: usize, note: &str, location: CommentLocation) -> Self {
        Self {
            generated_comment_index: index,
            generated_comment: note.to_string(),
            generated_location: location,
            line_match: false,
            semantic_match: false,
            line_matched_reference_id: None,
            semantic_matched_reference_id: None,
            matched_reference_id: None,
            matched_reference_note: None,
            matched_reference_location: None,
            matched_reference_details: None,
            location_match_details: None,
            llm_comparison: None,
        }
    }

    fn point_at(&mut self, cand: &Candidate<'_>, loc: LocationMatch) {
        self.matched_reference_id = Some(cand.key.clone());
        self.matched_reference_note = Some(cand.comment.note.clone());
        self.matched_reference_location = Some(cand.location.clone());
        self.matched_reference_details = Some(ReferenceDetails::from(cand.comment));
        self.location_match_details = Some(loc.details());
    }

    fn credit_line(&mut self, cand: &Candidate<'_>, loc: LocationMatch) {
        self.line_match = true;
        self.line_matched_reference_id = Some(cand.key.clone());
        self.point_at(cand, loc);
    }

    fn credit_semantic(&mut self, cand: &Candidate<'_>, loc: LocationMatch, verdict: Verdict) {
        self.semantic_match = true;
        self.semantic_matched_reference_id = Some(cand.key.clone());
        self.point_at(cand, loc);
        self.llm_comparison = Some(verdict);
    }
}

/// Run-level aggregate of one PR.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchStatistics {
    /// Generated comments that earned a semantic credit.
    pub positive_matches: usize,
    /// Generated comments that earned at least one line credit.
    pub positive_line_matches: usize,
    /// Generated comments without a semantic credit (0 when semantic
    /// matching is disabled).
    pub unmatched_count: usize,
    pub total_generated: usize,
    pub total_good: usize,
    pub match_details: Vec<MatchRecord>,
}

/// Bookkeeping key of a reference: its id, or `#<position>` when it has none.
pub fn reference_key(position: usize, comment: &ReferenceComment) -> String {
    match &comment.id {
        Some(id) => id.clone(),
        None => format!("#{position}"),
    }
}

/// A matchable reference with its location resolved once.
struct Candidate<'a> {
    key: String,
    comment: &'a ReferenceComment,
    location: CommentLocation,
}

/// Credits consumed so far; lives for one PR and is never shared.
#[derive(Default)]
struct RunContext {
    matched_by_line: HashSet<String>,
    matched_by_semantic: HashSet<String>,
}

impl RunContext {
    /// Claims the line credit of `key`; false if already taken.
    fn claim_line(&mut self, key: &str) -> bool {
        self.matched_by_line.insert(key.to_string())
    }

    fn semantic_free(&self, key: &str) -> bool {
        !self.matched_by_semantic.contains(key)
    }

    fn claim_semantic(&mut self, key: &str) {
        self.matched_by_semantic.insert(key.to_string());
    }
}

/// Matches `generated` against `good` under `config`.
///
/// `matcher` is consulted only when semantic matching is enabled.
///
/// # Errors
/// [`Error::Validation`] when semantic matching is enabled but no matcher
/// was supplied.
pub async fn match_all<M>(
    generated: &[GeneratedComment],
    good: &[ReferenceComment],
    config: &EvaluatorConfig,
    matcher: Option<&M>,
) -> EvalResult<MatchStatistics>
where
    M: SemanticMatcher,
{
    let semantic = if config.enable_semantic_match() {
        Some(matcher.ok_or_else(|| {
            Error::Validation("semantic matching is enabled but no matcher was provided".into())
        })?)
    } else {
        None
    };

    let started = Instant::now();
    let threshold = config.line_distance_threshold();

    let candidates: Vec<Candidate<'_>> = good
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_valid())
        .map(|(i, c)| Candidate {
            key: reference_key(i + 1, c),
            comment: c,
            location: CommentLocation::extract(c, false),
        })
        .collect();

    let mut stats = MatchStatistics {
        total_generated: generated.iter().filter(|c| c.is_valid()).count(),
        total_good: candidates.len(),
        ..MatchStatistics::default()
    };
    let mut ctx = RunContext::default();

    for (idx, gen_comment) in generated.iter().enumerate() {
        if !gen_comment.is_valid() {
            continue;
        }
        let gen_loc = CommentLocation::extract(gen_comment, true);
        let mut record = MatchRecord::new(idx + 1, &gen_comment.note, gen_loc);
        let mut line_counted = false;

        for cand in &candidates {
            let loc = match_location(&record.generated_location, &cand.location, &cand.key, threshold);
            if !loc.is_match {
                continue;
            }

            if ctx.claim_line(&cand.key) {
                record.credit_line(cand, loc);
                if !line_counted {
                    stats.positive_line_matches += 1;
                    line_counted = true;
                }
            }

            let Some(m) = semantic else { continue };
            if !ctx.semantic_free(&cand.key) {
                continue;
            }
            let verdict = m.compare(&gen_comment.note, &cand.comment.note).await;
            if verdict.is_similar {
                ctx.claim_semantic(&cand.key);
                record.credit_semantic(cand, loc, verdict);
                stats.positive_matches += 1;
                break;
            }
        }

        if semantic.is_some() && !record.semantic_match {
            stats.unmatched_count += 1;
        }

        debug!(
            index = record.generated_comment_index,
            line_match = record.line_match,
            semantic_match = record.semantic_match,
            reference = record.matched_reference_id.as_deref().unwrap_or("-"),
            "generated comment scanned"
        );
        stats.match_details.push(record);
    }

    info!(
        generated = stats.total_generated,
        references = stats.total_good,
        semantic_matches = stats.positive_matches,
        line_matches = stats.positive_line_matches,
        unmatched = stats.unmatched_count,
        latency_ms = started.elapsed().as_millis(),
        "matching finished"
    );

    Ok(stats)
}

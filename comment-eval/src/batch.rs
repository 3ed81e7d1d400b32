//! Batch evaluation over a directory of comment artifacts.
//!
//! Every file `comments_{repo}_{pr}.<ext>` in the input directory is resolved
//! to a PR of the reference dataset, evaluated with [`evaluate`], and folded
//! into a [`BatchSummary`]. PRs are independent, so up to
//! `max_concurrency` of them run at once; results keep file-name order.
//!
//! Environment (`BatchConfig::from_env`):
//!
//! | Var | Default |
//! |---|---|
//! | `EVAL_INPUT_DIR` | `comments` |
//! | `EVAL_FILE_EXTENSION` | `txt` |
//! | `EVAL_REFERENCE_FILE` | `dataset/positive_samples.json` |
//! | `EVAL_OUTPUT_FILE` | `results/evaluation_results.json` |
//! | `EVAL_MAX_CONCURRENCY` | `4` |

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{EvaluatorConfig, non_empty, parse_or};
use crate::errors::{ConfigError, Error, EvalResult};
use crate::evaluate::{EvaluationOutcome, evaluate, round_to};
use crate::matcher::SemanticMatcher;
use crate::model::PrRecord;
use crate::parser::load_generated_comments_from_file;

const DEFAULT_INPUT_DIR: &str = "comments";
const DEFAULT_FILE_EXTENSION: &str = "txt";
const DEFAULT_REFERENCE_FILE: &str = "dataset/positive_samples.json";
const DEFAULT_OUTPUT_FILE: &str = "results/evaluation_results.json";
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Where to read from, where to write to, and how wide to fan out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    /// Extension without the leading dot.
    pub file_extension: String,
    pub reference_file: PathBuf,
    pub output_file: PathBuf,
    /// PRs evaluated concurrently; at least 1.
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            reference_file: PathBuf::from(DEFAULT_REFERENCE_FILE),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl BatchConfig {
    pub fn from_env() -> EvalResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> EvalResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let max_concurrency: usize = parse_or(
            "EVAL_MAX_CONCURRENCY",
            lookup("EVAL_MAX_CONCURRENCY"),
            DEFAULT_MAX_CONCURRENCY,
        )?;
        if max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                var: "EVAL_MAX_CONCURRENCY",
                reason: "must be at least 1",
            }
            .into());
        }

        Ok(Self {
            input_dir: non_empty(lookup("EVAL_INPUT_DIR")).map_or(d.input_dir, PathBuf::from),
            file_extension: non_empty(lookup("EVAL_FILE_EXTENSION"))
                .map(|e| e.trim_start_matches('.').to_string())
                .unwrap_or(d.file_extension),
            reference_file: non_empty(lookup("EVAL_REFERENCE_FILE"))
                .map_or(d.reference_file, PathBuf::from),
            output_file: non_empty(lookup("EVAL_OUTPUT_FILE")).map_or(d.output_file, PathBuf::from),
            max_concurrency,
        })
    }
}

/// Aggregate over all evaluated PRs of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub evaluated_files: usize,
    pub skipped_files: usize,
    pub failed_files: usize,
    pub total_generated_comments: usize,
    pub total_reference_comments: usize,
    pub total_line_matches: usize,
    pub total_semantic_matches: usize,
    pub overall_line_match_rate: f64,
    pub overall_semantic_match_rate: f64,
    pub overall_line_recall: f64,
    pub overall_semantic_recall: f64,
    pub generated_at: DateTime<Utc>,
    /// One outcome per PR that reached [`evaluate`], in file-name order: full
    /// reports, filter skips and `{ "error": .. }` results alike.
    pub details: Vec<EvaluationOutcome>,
}

fn rate4(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round_to(numerator as f64 / denominator as f64, 4)
}

/// Reads the reference dataset (a JSON array of PR records).
pub async fn load_reference_dataset(path: impl AsRef<Path>) -> EvalResult<Vec<PrRecord>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        Error::Dataset(format!("cannot read reference file {}: {e}", path.display()))
    })?;
    let records: Vec<PrRecord> = serde_json::from_slice(&bytes)?;
    debug!(file = %path.display(), prs = records.len(), "reference dataset loaded");
    Ok(records)
}

pub fn find_reference_by_url<'a>(url: &str, dataset: &'a [PrRecord]) -> Option<&'a PrRecord> {
    dataset.iter().find(|r| r.github_pr_url == url)
}

/// Resolves `comments_{repo}_{pr}.<ext>` to a dataset PR URL.
///
/// The stem is split at its last `_`; a record matches when its URL contains
/// the repo (case-insensitive) and `/pull/{pr}`. Otherwise any record whose
/// repo segment and PR number both occur in the stem is taken.
pub fn infer_pr_url_from_filename(file_name: &str, dataset: &[PrRecord]) -> Option<String> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let stem_lower = stem.to_lowercase();

    if let Some((repo, pr_number)) = stem
        .strip_prefix("comments_")
        .and_then(|rest| rest.rsplit_once('_'))
    {
        let repo = repo.to_lowercase();
        let pull = format!("/pull/{pr_number}");
        if let Some(r) = dataset.iter().find(|r| {
            r.github_pr_url.to_lowercase().contains(&repo) && r.github_pr_url.contains(&pull)
        }) {
            return Some(r.github_pr_url.clone());
        }
    }

    dataset
        .iter()
        .find(|r| {
            let segments: Vec<&str> = r.github_pr_url.split('/').collect();
            if segments.len() < 7 {
                return false;
            }
            let repo = segments[segments.len() - 3].to_lowercase();
            let pr_number = segments[segments.len() - 1];
            stem_lower.contains(&repo) && stem.contains(pr_number)
        })
        .map(|r| r.github_pr_url.clone())
}

/// Files in `dir` with extension `ext`, sorted by name.
pub async fn list_comment_files(dir: &Path, ext: &str) -> EvalResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        Error::Dataset(format!("cannot read input directory {}: {e}", dir.display()))
    })?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches_ext = path.extension().and_then(|e| e.to_str()) == Some(ext);
        if matches_ext && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Per-file result before aggregation.
enum FileResult {
    /// Not evaluated (no URL, no reference, unreadable or empty file).
    NotEvaluated,
    Outcome(EvaluationOutcome),
}

async fn evaluate_file<M>(
    path: &Path,
    dataset: &[PrRecord],
    config: &EvaluatorConfig,
    matcher: Option<&M>,
) -> FileResult
where
    M: SemanticMatcher,
{
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let Some(pr_url) = infer_pr_url_from_filename(&file_name, dataset) else {
        warn!(file = %file_name, "skipped: cannot match PR URL");
        return FileResult::NotEvaluated;
    };
    let Some(record) = find_reference_by_url(&pr_url, dataset) else {
        warn!(file = %file_name, pr = %pr_url, "skipped: no reference data");
        return FileResult::NotEvaluated;
    };
    let generated = match load_generated_comments_from_file(path).await {
        Ok(c) if !c.is_empty() => c,
        Ok(_) => {
            warn!(file = %file_name, "skipped: no valid comments");
            return FileResult::NotEvaluated;
        }
        Err(e) => {
            warn!(file = %file_name, error = %e, "skipped: failed to read comments");
            return FileResult::NotEvaluated;
        }
    };

    let metadata = record.metadata();
    let outcome = evaluate(
        &pr_url,
        &generated,
        &record.comments,
        config,
        Some(&metadata),
        matcher,
    )
    .await;
    FileResult::Outcome(outcome)
}

/// Evaluates every comment file of `batch.input_dir`.
///
/// # Errors
/// Only batch-level problems: missing input directory, unreadable or
/// malformed reference file, or no matching files. Individual PRs never fail
/// the batch.
pub async fn evaluate_directory<M>(
    batch: &BatchConfig,
    config: &EvaluatorConfig,
    matcher: Option<&M>,
) -> EvalResult<BatchSummary>
where
    M: SemanticMatcher,
{
    let started = Instant::now();

    if !tokio::fs::try_exists(&batch.input_dir).await.unwrap_or(false) {
        return Err(Error::Dataset(format!(
            "input directory not found: {}",
            batch.input_dir.display()
        )));
    }
    let dataset = load_reference_dataset(&batch.reference_file).await?;
    let files = list_comment_files(&batch.input_dir, &batch.file_extension).await?;
    if files.is_empty() {
        return Err(Error::Dataset(format!(
            "no *.{} files in {}",
            batch.file_extension,
            batch.input_dir.display()
        )));
    }
    info!(
        files = files.len(),
        prs = dataset.len(),
        concurrency = batch.max_concurrency,
        line_threshold = config.line_distance_threshold(),
        semantic = config.enable_semantic_match(),
        "batch evaluation started"
    );

    let results: Vec<FileResult> = stream::iter(files.iter())
        .map(|path| evaluate_file(path, &dataset, config, matcher))
        .buffered(batch.max_concurrency.max(1))
        .collect()
        .await;

    let mut summary = BatchSummary {
        total_files: files.len(),
        evaluated_files: 0,
        skipped_files: 0,
        failed_files: 0,
        total_generated_comments: 0,
        total_reference_comments: 0,
        total_line_matches: 0,
        total_semantic_matches: 0,
        overall_line_match_rate: 0.0,
        overall_semantic_match_rate: 0.0,
        overall_line_recall: 0.0,
        overall_semantic_recall: 0.0,
        generated_at: Utc::now(),
        details: Vec::new(),
    };

    for result in results {
        let FileResult::Outcome(outcome) = result else {
            summary.skipped_files += 1;
            continue;
        };
        match &outcome {
            EvaluationOutcome::Evaluated(report) => {
                summary.evaluated_files += 1;
                summary.total_generated_comments += report.total_generated_nums;
                summary.total_reference_comments += report.positive_expected_nums;
                summary.total_line_matches += report.positive_line_match_nums;
                summary.total_semantic_matches += report.positive_match_nums;
            }
            EvaluationOutcome::Skipped(_) => summary.skipped_files += 1,
            EvaluationOutcome::Failed { .. } => summary.failed_files += 1,
        }
        summary.details.push(outcome);
    }

    summary.overall_line_match_rate =
        rate4(summary.total_line_matches, summary.total_generated_comments);
    summary.overall_semantic_match_rate =
        rate4(summary.total_semantic_matches, summary.total_generated_comments);
    summary.overall_line_recall =
        rate4(summary.total_line_matches, summary.total_reference_comments);
    summary.overall_semantic_recall =
        rate4(summary.total_semantic_matches, summary.total_reference_comments);

    info!(
        evaluated = summary.evaluated_files,
        skipped = summary.skipped_files,
        failed = summary.failed_files,
        semantic_recall = summary.overall_semantic_recall,
        line_recall = summary.overall_line_recall,
        latency_ms = started.elapsed().as_millis(),
        "batch evaluation finished"
    );
    Ok(summary)
}

/// Writes `summary` as pretty JSON, creating parent directories.
pub async fn write_summary(path: impl AsRef<Path>, summary: &BatchSummary) -> EvalResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(summary)?;
    tokio::fs::write(path, json).await?;
    info!(file = %path.display(), "results written");
    Ok(())
}

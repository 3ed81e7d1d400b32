//! Quality evaluation of generated code-review comments.
//!
//! Given the comments an automated reviewer produced for a pull request and
//! a curated set of reference ("good") comments for the same PR, the crate
//! decides which generated comments hit a reference and reports precision-
//! and recall-style rates with a per-comment audit trail.
//!
//! 1) **Parse**: [`parser`] reads the tagged text artifact into
//!    [`GeneratedComment`]s.
//! 2) **Filter**: [`FilterConfig`] may skip the PR or narrow the references.
//! 3) **Match**: [`engine::match_all`] runs the location gate
//!    ([`location`]) and then the pluggable [`SemanticMatcher`], crediting
//!    each reference at most once per match kind.
//! 4) **Report**: [`evaluate()`] turns the statistics into an
//!    [`EvaluationOutcome`]; [`batch`] does this for a whole directory.
//!
//! No `async-trait` and no boxed trait objects: the matcher trait uses a
//! native async method and [`SemanticMatcherClient`] dispatches over the two
//! backends by enum.

pub mod batch;
pub mod config;
pub mod engine;
pub mod errors;
pub mod evaluate;
pub mod filter;
pub mod location;
pub mod matcher;
pub mod model;
pub mod parser;

pub use batch::{BatchConfig, BatchSummary, evaluate_directory, write_summary};
pub use config::{
    CommentCategory, CommentContext, EvaluatorConfig, PrCategory, ProjectLanguage,
    SemanticMatcherType,
};
pub use engine::{MatchRecord, MatchStatistics, match_all};
pub use errors::{ConfigError, Error, EvalResult};
pub use evaluate::{EvaluationOutcome, EvaluationReport, evaluate, parse_github_pr_url};
pub use filter::FilterConfig;
pub use location::{CommentLocation, match_location, normalize_path, ranges_overlap};
pub use matcher::{SemanticMatcher, SemanticMatcherClient, Verdict};
pub use model::{GeneratedComment, PrMetadata, PrRecord, ReferenceComment};
pub use parser::{load_generated_comments_from_file, parse_generated_comments};

use ai_llm_service::telemetry;
use anyhow::Context;
use colored::Colorize;
use comment_eval::{
    BatchConfig, BatchSummary, EvaluatorConfig, SemanticMatcherClient, evaluate_directory,
    write_summary,
};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events reach the console.
const LOG_TARGETS: &[&str] = &["review_eval", "comment_eval", telemetry::TARGET_PREFIX];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; variables may come from the process environment.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("info", Level::INFO))
        .with(telemetry::layer(LOG_TARGETS))
        .init();

    match dotenv {
        Ok(path) => info!(file = %path.display(), ".env loaded"),
        Err(e) => warn!(error = %e, "no .env loaded, using process environment"),
    }

    let batch = BatchConfig::from_env().context("invalid batch configuration")?;
    let config = EvaluatorConfig::from_env().context("invalid evaluation configuration")?;

    // Built once; every PR of the batch borrows the same client.
    let matcher = if config.enable_semantic_match() {
        Some(
            SemanticMatcherClient::from_env(config.semantic_matcher_type())
                .context("cannot build semantic matcher")?,
        )
    } else {
        None
    };

    println!("{}", "Review comment evaluation".bold());
    println!("  input      : {}", batch.input_dir.display());
    println!("  references : {}", batch.reference_file.display());
    println!("  output     : {}", batch.output_file.display());
    println!(
        "  policy     : line_threshold={} semantic={} matcher={}",
        config.line_distance_threshold(),
        config.enable_semantic_match(),
        matcher
            .as_ref()
            .map(|m| format!("{} ({})", m.kind(), m.model()))
            .unwrap_or_else(|| "-".to_string()),
    );

    let summary = evaluate_directory(&batch, &config, matcher.as_ref())
        .await
        .context("batch evaluation failed")?;
    write_summary(&batch.output_file, &summary)
        .await
        .with_context(|| format!("cannot write {}", batch.output_file.display()))?;

    print_summary(&summary);
    println!("\nResults saved to {}", batch.output_file.display().to_string().cyan());
    Ok(())
}

fn percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

fn print_summary(s: &BatchSummary) {
    println!("\n{}", "Evaluation summary".bold());
    println!(
        "  files      : {}/{} evaluated, {} skipped, {}",
        s.evaluated_files.to_string().green(),
        s.total_files,
        s.skipped_files.to_string().yellow(),
        if s.failed_files > 0 {
            format!("{} failed", s.failed_files).red()
        } else {
            "0 failed".normal()
        }
    );
    println!("  generated  : {}", s.total_generated_comments);
    println!("  references : {}", s.total_reference_comments);
    println!("  line match rate     : {}", percent(s.overall_line_match_rate));
    println!("  semantic match rate : {}", percent(s.overall_semantic_match_rate));
    println!("  line recall         : {}", percent(s.overall_line_recall));
    println!(
        "  semantic recall     : {}",
        percent(s.overall_semantic_recall).green().bold()
    );
}

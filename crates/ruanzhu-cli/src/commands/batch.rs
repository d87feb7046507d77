//! Batch command - process a directory of certificates into a spreadsheet.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use ruanzhu_core::batch::{discover, BatchSummary, FileOutcome};
use ruanzhu_core::{BatchAggregator, BatchResult, FailureEntry, ReportBuilder};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Directory containing certificate PDFs and images
    #[arg(required = true)]
    input_dir: PathBuf,

    /// Output spreadsheet (.xlsx)
    #[arg(short, long)]
    output: PathBuf,

    /// Number of files processed concurrently (overrides config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Write a machine-readable run summary (JSON)
    #[arg(long)]
    json_summary: Option<PathBuf>,
}

/// JSON run summary.
#[derive(Serialize)]
struct JsonSummary<'a> {
    generated_at: String,
    input_dir: &'a Path,
    output: &'a Path,
    #[serde(flatten)]
    summary: BatchSummary,
    failures: &'a [FailureEntry],
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    let pipeline = super::check::build_pipeline(&config)?;
    super::check::preflight(pipeline.ocr())?;

    let documents = discover(&args.input_dir, &config.batch.extensions)?;
    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        documents.len()
    );

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );

    let progress_pb = pb.clone();
    let jobs = args.jobs.unwrap_or(config.batch.jobs);
    let aggregator = BatchAggregator::new(Arc::new(pipeline))
        .with_jobs(jobs)
        .with_progress(Arc::new(move |outcome: &FileOutcome| {
            let name = outcome
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            progress_pb.set_message(name);
            progress_pb.inc(1);
        }));

    let cancel = aggregator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing files already in progress");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    info!("Processing with {} worker(s)", jobs.max(1));
    let result = aggregator.run(documents).await;
    pb.finish_and_clear();

    if !result.failures.is_empty() {
        let summary_path = summary_csv_path(&args.output);
        write_failures(&summary_path, &result.failures)?;
        println!(
            "{} Failures written to {}",
            style("ℹ").blue(),
            summary_path.display()
        );
    }

    if let Some(path) = &args.json_summary {
        let summary = JsonSummary {
            generated_at: chrono::Local::now().to_rfc3339(),
            input_dir: &args.input_dir,
            output: &args.output,
            summary: result.summary(),
            failures: &result.failures,
        };
        fs::write(path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    print_summary(&result, start);

    result.check()?;

    ReportBuilder::from_config(&config.report).write(&result.records, &args.output)?;
    println!(
        "{} Report written to {}",
        style("✓").green(),
        args.output.display()
    );

    Ok(())
}

/// `<output>.summary.csv` next to the spreadsheet.
fn summary_csv_path(output: &Path) -> PathBuf {
    output.with_extension("summary.csv")
}

fn write_failures(path: &Path, failures: &[FailureEntry]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["path", "page", "kind", "reason"])?;
    for failure in failures {
        wtr.write_record([
            failure.path.display().to_string(),
            failure.page.map(|p| p.to_string()).unwrap_or_default(),
            failure.kind.to_string(),
            failure.reason.clone(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn print_summary(result: &BatchResult, start: Instant) {
    let summary = result.summary();

    println!();
    println!(
        "{} Processed {} files ({} pages) in {:?}",
        style("✓").green(),
        summary.files,
        summary.pages,
        start.elapsed()
    );
    println!(
        "   {} records, {} failed",
        style(summary.records).green(),
        style(summary.failures).red()
    );
    if summary.filename_fallbacks > 0 {
        println!(
            "   {} software name(s) taken from file names",
            style(summary.filename_fallbacks).yellow()
        );
    }
    if summary.skipped > 0 {
        println!("   {} file(s) skipped after interrupt", style(summary.skipped).yellow());
    }

    if !result.failures.is_empty() {
        println!();
        println!("{}", style("Failures:").red());
        for failure in &result.failures {
            println!("  - [{}] {}", failure.kind, failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_csv_path() {
        assert_eq!(
            summary_csv_path(Path::new("out/report.xlsx")),
            PathBuf::from("out/report.summary.csv")
        );
    }
}

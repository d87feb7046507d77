//! Report command - build a spreadsheet from records JSON.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use console::style;
use glob::glob;
use serde::Deserialize;
use tracing::debug;

use ruanzhu_core::batch::renumber;
use ruanzhu_core::{ExtractedRecord, ReportBuilder};

/// Arguments for the report command.
#[derive(Args)]
pub struct ReportArgs {
    /// Records JSON file(s) or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output spreadsheet (.xlsx)
    #[arg(short, long)]
    output: PathBuf,

    /// Worksheet title (overrides config)
    #[arg(long)]
    sheet_name: Option<String>,
}

/// A records file holds either one record or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsFile {
    Many(Vec<ExtractedRecord>),
    One(ExtractedRecord),
}

pub async fn run(args: ReportArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?.filter_map(|r| r.ok()).collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    let mut records = Vec::new();
    let mut skipped = 0;
    for path in &files {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let parsed: RecordsFile = serde_json::from_str(&content)
            .with_context(|| format!("Invalid records JSON in {}", path.display()))?;

        let loaded = match parsed {
            RecordsFile::Many(many) => many,
            RecordsFile::One(one) => vec![one],
        };
        let before = records.len();
        for record in loaded {
            if record.is_viable() {
                records.push(record);
            } else {
                skipped += 1;
            }
        }
        debug!("Loaded {} record(s) from {}", records.len() - before, path.display());
    }

    if skipped > 0 {
        println!(
            "{} Skipped {} entries without software name or registration number",
            style("⚠").yellow(),
            skipped
        );
    }

    if records.is_empty() {
        anyhow::bail!("No records found in {}", args.input);
    }

    renumber(&mut records);

    let mut builder = ReportBuilder::from_config(&config.report);
    if let Some(name) = &args.sheet_name {
        builder = builder.with_sheet_name(name);
    }
    builder.write(&records, &args.output)?;

    println!(
        "{} Wrote {} record(s) to {}",
        style("✓").green(),
        records.len(),
        args.output.display()
    );

    Ok(())
}

//! Extract command - recognize the raw text of a single certificate file.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::warn;

use ruanzhu_core::certificate::join_pages;
use ruanzhu_core::models::DocumentFormat;
use ruanzhu_core::SourceDocument;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum pages to recognize (overrides config, 0 = all)
    #[arg(long)]
    max_pages: Option<u32>,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    let doc = SourceDocument::open(&args.input)?;

    let mut pipeline = super::check::build_pipeline(&config)?;
    if let Some(max_pages) = args.max_pages {
        pipeline = pipeline.with_max_pages(max_pages);
    }
    super::check::preflight(pipeline.ocr())?;

    let pages = pipeline.extract_text(&doc)?;
    let page_count = pages.len();

    let mut texts = Vec::with_capacity(page_count);
    let mut failed = 0;
    for page in pages {
        match page.text {
            Ok(text) => texts.push(text),
            Err(e) => {
                warn!("Page {} of {}: {}", page.number, args.input.display(), e);
                failed += 1;
                texts.push(String::new());
            }
        }
    }

    if failed == page_count {
        anyhow::bail!("No text recognized in {}", args.input.display());
    }

    let content = match doc.format {
        DocumentFormat::Pdf => join_pages(&texts),
        DocumentFormat::Image => texts.concat().trim_end().to_string(),
    };
    super::write_output(args.output.as_deref(), &content)?;

    if args.output.is_some() {
        println!(
            "{} Recognized {} of {} page(s) in {:?}",
            style("✓").green(),
            page_count - failed,
            page_count,
            start.elapsed()
        );
    }

    Ok(())
}

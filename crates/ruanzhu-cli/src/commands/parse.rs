//! Parse command - turn recognized text into certificate records.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::warn;

use ruanzhu_core::batch::renumber;
use ruanzhu_core::CertificateParser;

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Text file with recognized text (default: stdin)
    input: Option<PathBuf>,

    /// Input is page-delimited; emit one record per page
    #[arg(long)]
    pages: bool,

    /// Source document, used for the software-name filename fallback
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let parser = CertificateParser::from_config(&config.extraction)?;

    let text = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let source = args.source.as_deref();

    let content = if args.pages {
        let mut records = Vec::new();
        for (i, result) in parser.parse_pages(&text, source).into_iter().enumerate() {
            match result {
                Ok(record) => records.push(record),
                Err(e) => warn!("Page {}: {}", i + 1, e),
            }
        }
        if records.is_empty() {
            anyhow::bail!("No records could be extracted");
        }
        renumber(&mut records);
        serde_json::to_string_pretty(&records)?
    } else {
        let mut record = parser.parse(&text, source)?;
        record.serial = 1;
        serde_json::to_string_pretty(&record)?
    };

    super::write_output(args.output.as_deref(), &content)
}

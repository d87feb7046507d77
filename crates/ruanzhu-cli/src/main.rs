//! CLI application for software-copyright certificate OCR.

mod commands;

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use commands::{batch, check, config, extract, parse, report};

/// Software-copyright certificate OCR - Turn scanned certificates into a spreadsheet
#[derive(Parser)]
#[command(name = "ruanzhu")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Also write the log to this file
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize the text of a single certificate file
    Extract(extract::ExtractArgs),

    /// Parse recognized text into certificate records
    Parse(parse::ParseArgs),

    /// Process a directory of certificates into a spreadsheet
    Batch(batch::BatchArgs),

    /// Build a spreadsheet from records JSON
    Report(report::ReportArgs),

    /// Verify the OCR engine and language packs
    Check,

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("{} Failed to set up logging: {:#}", style("✗").red(), e);
        return ExitCode::FAILURE;
    }

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Extract(args) => extract::run(args, config_path).await,
        Commands::Parse(args) => parse::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Report(args) => report::run(args, config_path).await,
        Commands::Check => check::run(config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("✗").red(), e);
            if e.downcast_ref::<check::PreflightError>().is_some() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Logs go to stderr so command output on stdout stays clean. `RUST_LOG`
/// takes precedence over `-v`.
fn init_logging(verbose: u8, log_file: Option<&str>) -> anyhow::Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(Path::new(path))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()?;

    Ok(())
}

//! Subcommand implementations.

pub mod batch;
pub mod check;
pub mod config;
pub mod extract;
pub mod parse;
pub mod report;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use ruanzhu_core::RuanzhuConfig;

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ruanzhu")
        .join("config.json")
}

/// Load the configuration from `--config`, the default location, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RuanzhuConfig> {
    if let Some(path) = config_path {
        return RuanzhuConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path));
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Loading config from {}", default_path.display());
        return RuanzhuConfig::from_file(&default_path)
            .with_context(|| format!("Failed to load config from {}", default_path.display()));
    }

    Ok(RuanzhuConfig::default())
}

/// Write command output to a file, or stdout when no path is given.
pub fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            debug!("Wrote output to {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

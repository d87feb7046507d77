//! Check command - verify external tools before processing.

use std::fmt;

use console::style;
use tracing::info;

use ruanzhu_core::error::EngineError;
use ruanzhu_core::models::config::{OcrEngineKind, RasterizerKind};
use ruanzhu_core::ocr::EngineInfo;
use ruanzhu_core::pdf::PdftoppmRasterizer;
use ruanzhu_core::{create_engine, create_rasterizer, DocumentPipeline, OcrBackend, RuanzhuConfig, RuanzhuError};

/// The OCR engine or its language packs are unusable. Exits with code 2.
#[derive(Debug)]
pub struct PreflightError(pub EngineError);

impl fmt::Display for PreflightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OCR engine preflight failed: {}", self.0)
    }
}

impl std::error::Error for PreflightError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Run the engine preflight once, before any document is processed.
pub fn preflight(engine: &dyn OcrBackend) -> anyhow::Result<EngineInfo> {
    let engine_info = engine.preflight().map_err(PreflightError)?;
    info!(
        "Using {} ({}) with {} language pack(s)",
        engine_info.engine,
        engine_info.version,
        engine_info.languages.len()
    );
    Ok(engine_info)
}

/// Build the document pipeline. An engine that cannot be constructed
/// fails the same way as a failed preflight.
pub fn build_pipeline(config: &RuanzhuConfig) -> anyhow::Result<DocumentPipeline> {
    match DocumentPipeline::from_config(config) {
        Ok(pipeline) => Ok(pipeline),
        Err(RuanzhuError::Engine(e)) => Err(PreflightError(e).into()),
        Err(e) => Err(e.into()),
    }
}

pub async fn run(config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    let engine = create_engine(&config).map_err(PreflightError)?;
    let engine_info = preflight(engine.as_ref())?;

    println!("{} {} ({})", style("✓").green(), engine_info.engine, engine_info.version);
    if config.ocr.engine == OcrEngineKind::Auto {
        println!("   Selected automatically");
    }
    println!("   Language: {}", config.ocr.language);
    println!("   Installed: {}", engine_info.languages.join(", "));

    let rasterizer = create_rasterizer(&config.pdf);
    let pdftoppm_ok = PdftoppmRasterizer::from_config(&config.pdf).is_available();
    if config.pdf.rasterizer == RasterizerKind::Pdftoppm && !pdftoppm_ok {
        println!(
            "{} {} not found; PDF files will fail to rasterize",
            style("⚠").yellow(),
            config.pdf.pdftoppm_cmd
        );
    } else {
        println!("{} PDF rasterizer: {}", style("✓").green(), rasterizer.name());
    }

    Ok(())
}

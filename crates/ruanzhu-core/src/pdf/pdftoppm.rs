//! Page rendering through poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::InputError;
use crate::models::config::PdfConfig;

use super::{PageRasterizer, RasterizedPage};

/// Renders pages with `pdftoppm -png` into a temporary directory.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    command: String,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn from_config(config: &PdfConfig) -> Self {
        Self {
            command: config.pdftoppm_cmd.clone(),
            dpi: config.render_dpi,
        }
    }

    /// Whether the executable can be started.
    pub fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("-v")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    fn rasterize(&self, path: &Path, max_pages: u32) -> Result<Vec<RasterizedPage>, InputError> {
        let dir = tempfile::tempdir()?;
        let prefix = dir.path().join("page");

        let mut command = Command::new(&self.command);
        command.arg("-png").arg("-r").arg(self.dpi.to_string());
        if max_pages > 0 {
            command.arg("-l").arg(max_pages.to_string());
        }
        let output = command
            .arg(path)
            .arg(&prefix)
            .output()
            .map_err(|e| InputError::Pdf(format!("failed to run {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.contains("Incorrect password") {
                return Err(InputError::Encrypted);
            }
            return Err(InputError::Pdf(stderr.to_string()));
        }

        // pdftoppm zero-pads page numbers to a common width, so name order is page order
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(InputError::NoPages);
        }
        debug!("pdftoppm rendered {} page(s) from {}", files.len(), path.display());

        let pages = files
            .iter()
            .enumerate()
            .map(|(i, file)| {
                let number = i as u32 + 1;
                match image::open(file) {
                    Ok(image) => RasterizedPage::ok(number, image),
                    Err(e) => RasterizedPage::failed(number, e.to_string()),
                }
            })
            .collect();

        Ok(pages)
    }
}

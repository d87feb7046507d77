//! Configuration structures for the certificate pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration for the ruanzhu pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuanzhuConfig {
    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// PDF rasterization configuration.
    pub pdf: PdfConfig,

    /// Certificate field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Batch run configuration.
    pub batch: BatchConfig,

    /// Spreadsheet report configuration.
    pub report: ReportConfig,

    /// PaddleOCR model files.
    pub models: ModelConfig,
}

/// Which OCR engine recognizes page text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrEngineKind {
    /// PaddleOCR when its models are present and the language is Chinese,
    /// otherwise Tesseract.
    #[default]
    Auto,
    /// External `tesseract` process.
    Tesseract,
    /// PaddleOCR models run in-process.
    Paddle,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Engine selection.
    pub engine: OcrEngineKind,

    /// Tesseract executable name or path.
    pub tesseract_cmd: String,

    /// Tesseract language pack(s), `+`-separated. Must include `chi_sim`.
    pub language: String,

    /// OCR engine mode (`--oem`).
    pub oem: u32,

    /// Page segmentation mode (`--psm`).
    pub psm: u32,

    /// Resolution hint passed to the engine.
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngineKind::Auto,
            tesseract_cmd: "tesseract".to_string(),
            language: "chi_sim".to_string(),
            oem: 1,
            psm: 6,
            dpi: 300,
        }
    }
}

/// Which tool turns PDF pages into images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterizerKind {
    /// Use `pdftoppm` when installed, otherwise embedded page images.
    Auto,
    /// Render pages with poppler's `pdftoppm`.
    Pdftoppm,
    /// Decode the scan image embedded in each page.
    Embedded,
}

/// PDF rasterization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Rasterizer selection.
    pub rasterizer: RasterizerKind,

    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// `pdftoppm` executable name or path.
    pub pdftoppm_cmd: String,

    /// Maximum pages to process per document (0 = unlimited).
    pub max_pages: u32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            rasterizer: RasterizerKind::Auto,
            render_dpi: 300,
            pdftoppm_cmd: "pdftoppm".to_string(),
            max_pages: 0,
        }
    }
}

/// Certificate extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Software names shorter than this (in characters, after cleaning)
    /// are replaced by the filename fallback.
    pub min_name_chars: usize,

    /// Enable the filename fallback for the software name.
    pub filename_fallback: bool,

    /// Additional garbled -> correct pairs merged into the built-in table.
    pub extra_corrections: Vec<(String, String)>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_name_chars: crate::certificate::MIN_SOFTWARE_NAME_CHARS,
            filename_fallback: true,
            extra_corrections: Vec::new(),
        }
    }
}

/// Batch run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of files processed concurrently.
    pub jobs: usize,

    /// File extensions (lowercase, without dot) picked up from the input directory.
    pub extensions: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            extensions: crate::batch::SUPPORTED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Spreadsheet report configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Worksheet title.
    pub sheet_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sheet_name: "软件著作权清单".to_string(),
        }
    }
}

/// PaddleOCR model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Chinese text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "ch_rec.onnx".to_string(),
            dictionary: "ch_dict.txt".to_string(),
        }
    }
}

impl ModelConfig {
    pub fn detection_path(&self) -> PathBuf {
        self.model_dir.join(&self.detection_model)
    }

    pub fn recognition_path(&self) -> PathBuf {
        self.model_dir.join(&self.recognition_model)
    }

    pub fn dictionary_path(&self) -> PathBuf {
        self.model_dir.join(&self.dictionary)
    }

    /// Model files that do not exist on disk.
    pub fn missing_files(&self) -> Vec<PathBuf> {
        [
            self.detection_path(),
            self.recognition_path(),
            self.dictionary_path(),
        ]
        .into_iter()
        .filter(|path| !path.is_file())
        .collect()
    }
}

impl RuanzhuConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RuanzhuConfig =
            serde_json::from_str(r#"{"ocr": {"psm": 3}, "batch": {"jobs": 4}}"#).unwrap();

        assert_eq!(config.ocr.psm, 3);
        assert_eq!(config.ocr.language, "chi_sim");
        assert_eq!(config.batch.jobs, 4);
        assert_eq!(config.pdf.rasterizer, RasterizerKind::Auto);
        assert_eq!(config.extraction.min_name_chars, 4);
        assert_eq!(config.ocr.engine, OcrEngineKind::Auto);
        assert_eq!(config.models.model_dir, PathBuf::from("models"));
    }

    #[test]
    fn test_engine_kind_names() {
        let config: RuanzhuConfig =
            serde_json::from_str(r#"{"ocr": {"engine": "paddle"}, "models": {"model_dir": "/opt/ocr"}}"#)
                .unwrap();

        assert_eq!(config.ocr.engine, OcrEngineKind::Paddle);
        assert_eq!(config.models.recognition_path(), PathBuf::from("/opt/ocr/ch_rec.onnx"));
        assert!(serde_json::from_str::<OcrConfig>(r#"{"engine": "easyocr"}"#).is_err());
    }

    #[test]
    fn test_missing_model_files() {
        let dir = tempfile::tempdir().unwrap();
        let models = ModelConfig {
            model_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert_eq!(models.missing_files().len(), 3);

        std::fs::write(models.detection_path(), b"onnx").unwrap();
        std::fs::write(models.recognition_path(), b"onnx").unwrap();
        assert_eq!(models.missing_files(), vec![models.dictionary_path()]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = RuanzhuConfig::default();
        config.pdf.rasterizer = RasterizerKind::Embedded;
        config
            .extraction
            .extra_corrections
            .push(("登记亏".to_string(), "登记号".to_string()));
        config.save(&path).unwrap();

        let loaded = RuanzhuConfig::from_file(&path).unwrap();
        assert_eq!(loaded.pdf.rasterizer, RasterizerKind::Embedded);
        assert_eq!(loaded.extraction.extra_corrections.len(), 1);
    }
}

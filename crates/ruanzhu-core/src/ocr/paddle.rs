//! PaddleOCR models run in-process through `pure-onnx-ocr`.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::models::config::ModelConfig;

use super::{EngineInfo, OcrBackend, REQUIRED_LANGUAGE};

/// Boxes whose top edges fall in the same band of this many pixels are
/// read as one row.
const ROW_HEIGHT: f64 = 20.0;

/// One recognized text box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Left edge of the box.
    pub x: f64,
    /// Top edge of the box.
    pub y: f64,
    pub text: String,
}

/// Join text boxes top to bottom, then left to right within a row.
pub fn join_reading_order(mut lines: Vec<TextLine>) -> String {
    lines.sort_by(|a, b| {
        let row_a = (a.y / ROW_HEIGHT) as i64;
        let row_b = (b.y / ROW_HEIGHT) as i64;
        row_a
            .cmp(&row_b)
            .then_with(|| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    lines
        .iter()
        .map(|line| line.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// OCR backend over PaddleOCR detection and Chinese recognition models.
pub struct PaddleEngine {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
    model_dir: PathBuf,
}

impl PaddleEngine {
    /// Load the models named by `config`.
    pub fn from_config(config: &ModelConfig) -> Result<Self, EngineError> {
        let missing = config.missing_files();
        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
            return Err(EngineError::ModelLoad(format!(
                "missing model file(s): {}",
                names.join(", ")
            )));
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&config.detection_path())
            .rec_model_path(&config.recognition_path())
            .dictionary_path(&config.dictionary_path())
            .build()
            .map_err(|e| EngineError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded PaddleOCR models from {}", config.model_dir.display());

        Ok(Self {
            engine: Mutex::new(engine),
            model_dir: config.model_dir.clone(),
        })
    }
}

impl OcrBackend for PaddleEngine {
    fn name(&self) -> &str {
        "paddle"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, EngineError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let engine = self
            .engine
            .lock()
            .map_err(|_| EngineError::Failed("PaddleOCR engine lock poisoned".to_string()))?;
        let results = engine
            .run_from_image(image)
            .map_err(|e| EngineError::Failed(format!("pure-onnx-ocr: {}", e)))?;
        drop(engine);

        let lines: Vec<TextLine> = results
            .iter()
            .map(|r| {
                let (x, y) = top_left(&r.bounding_box);
                TextLine {
                    x,
                    y,
                    text: r.text.replace("[UNK]", " "),
                }
            })
            .collect();

        debug!(
            "PaddleOCR: {} text boxes on {}x{} in {}ms",
            lines.len(),
            width,
            height,
            start.elapsed().as_millis()
        );
        Ok(join_reading_order(lines))
    }

    fn preflight(&self) -> Result<EngineInfo, EngineError> {
        // Models are loaded at construction; a built engine is usable.
        Ok(EngineInfo {
            engine: self.name().to_string(),
            version: format!("pure-onnx-ocr ({})", self.model_dir.display()),
            languages: vec![REQUIRED_LANGUAGE.to_string()],
        })
    }
}

/// Smallest x and y over the box outline.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f64, f64) {
    polygon
        .exterior()
        .coords()
        .fold((f64::MAX, f64::MAX), |(x, y), c| (x.min(c.x), y.min(c.y)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(x: f64, y: f64, text: &str) -> TextLine {
        TextLine {
            x,
            y,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_join_reading_order() {
        let lines = vec![
            line(300.0, 64.0, "2021SR123456"),
            line(10.0, 8.0, "计算机软件著作权登记证书"),
            line(10.0, 62.0, "登记号："),
            line(10.0, 30.0, "软件名称：悬浮窗管理系统"),
        ];

        assert_eq!(
            join_reading_order(lines),
            "计算机软件著作权登记证书\n软件名称：悬浮窗管理系统\n登记号：\n2021SR123456"
        );
    }

    #[test]
    fn test_join_reading_order_skips_blank_boxes() {
        let lines = vec![line(0.0, 0.0, "  "), line(0.0, 40.0, "权利范围：全部权利")];
        assert_eq!(join_reading_order(lines), "权利范围：全部权利");
        assert_eq!(join_reading_order(Vec::new()), "");
    }

    #[test]
    fn test_missing_models_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig {
            model_dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let err = PaddleEngine::from_config(&config).err().unwrap();
        assert!(matches!(err, EngineError::ModelLoad(_)));
        assert!(err.to_string().contains("ch_rec.onnx"));
    }
}

//! OCR adapter over an external recognition engine.

#[cfg(feature = "paddle")]
mod paddle;
mod preprocessing;
mod tesseract;

#[cfg(feature = "paddle")]
pub use paddle::{join_reading_order, PaddleEngine, TextLine};
pub use preprocessing::{ImagePreprocessor, DEFAULT_CONTRAST};
pub use tesseract::{missing_languages, parse_language_list, require_language, TesseractEngine};

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineError;
use crate::models::config::{ModelConfig, OcrConfig, OcrEngineKind};
use crate::models::RuanzhuConfig;

/// Language pack required for certificate text.
pub const REQUIRED_LANGUAGE: &str = "chi_sim";

/// What a successful preflight found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineInfo {
    /// Engine name.
    pub engine: String,
    /// Version line reported by the engine.
    pub version: String,
    /// Installed language packs.
    pub languages: Vec<String>,
}

/// Text recognition backend.
///
/// Implementations must be safe to call from several workers at once.
pub trait OcrBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Recognize text on a preprocessed page image. The result may be empty.
    fn recognize(&self, image: &DynamicImage) -> Result<String, EngineError>;

    /// Check that the engine and its language packs are usable.
    fn preflight(&self) -> Result<EngineInfo, EngineError>;
}

/// Whether the PaddleOCR backend was compiled in.
pub const PADDLE_AVAILABLE: bool = cfg!(feature = "paddle");

/// Resolve `auto` to a concrete engine. PaddleOCR is preferred for Chinese
/// text when it is compiled in and its model files are present.
pub fn select_engine(ocr: &OcrConfig, models: &ModelConfig) -> OcrEngineKind {
    match ocr.engine {
        OcrEngineKind::Auto => {
            let chinese = ocr.language.contains("chi");
            if PADDLE_AVAILABLE && chinese && models.missing_files().is_empty() {
                OcrEngineKind::Paddle
            } else {
                OcrEngineKind::Tesseract
            }
        }
        kind => kind,
    }
}

/// Build the OCR backend described by `config`.
pub fn create_engine(config: &RuanzhuConfig) -> Result<Arc<dyn OcrBackend>, EngineError> {
    let kind = select_engine(&config.ocr, &config.models);
    debug!("OCR engine {:?} resolved to {:?}", config.ocr.engine, kind);

    match kind {
        #[cfg(feature = "paddle")]
        OcrEngineKind::Paddle => Ok(Arc::new(PaddleEngine::from_config(&config.models)?)),
        #[cfg(not(feature = "paddle"))]
        OcrEngineKind::Paddle => Err(EngineError::Unavailable("paddle")),
        OcrEngineKind::Tesseract | OcrEngineKind::Auto => {
            Ok(Arc::new(TesseractEngine::from_config(&config.ocr)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn models_in(dir: &std::path::Path) -> ModelConfig {
        ModelConfig {
            model_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_auto_without_models_uses_tesseract() {
        let dir = tempfile::tempdir().unwrap();
        let ocr = OcrConfig::default();

        assert_eq!(select_engine(&ocr, &models_in(dir.path())), OcrEngineKind::Tesseract);
    }

    #[test]
    fn test_auto_prefers_paddle_for_chinese() {
        let dir = tempfile::tempdir().unwrap();
        let models = models_in(dir.path());
        for path in [models.detection_path(), models.recognition_path(), models.dictionary_path()] {
            std::fs::write(path, b"model").unwrap();
        }

        let chinese = OcrConfig::default();
        let expected = if PADDLE_AVAILABLE {
            OcrEngineKind::Paddle
        } else {
            OcrEngineKind::Tesseract
        };
        assert_eq!(select_engine(&chinese, &models), expected);

        let english = OcrConfig {
            language: "eng".to_string(),
            ..Default::default()
        };
        assert_eq!(select_engine(&english, &models), OcrEngineKind::Tesseract);
    }

    #[test]
    fn test_explicit_engine_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let ocr = OcrConfig {
            engine: OcrEngineKind::Paddle,
            ..Default::default()
        };

        assert_eq!(select_engine(&ocr, &models_in(dir.path())), OcrEngineKind::Paddle);
    }

    #[test]
    fn test_create_engine() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RuanzhuConfig::default();
        config.models = models_in(dir.path());

        let engine = create_engine(&config).unwrap();
        assert_eq!(engine.name(), "tesseract");

        config.ocr.engine = OcrEngineKind::Paddle;
        assert!(create_engine(&config).is_err());
    }
}

//! Tesseract engine driven as a child process.

use std::path::Path;
use std::process::Command;

use image::{DynamicImage, ImageFormat};
use tracing::{debug, trace};

use crate::error::EngineError;
use crate::models::config::OcrConfig;

use super::{EngineInfo, OcrBackend, REQUIRED_LANGUAGE};

/// Parse `tesseract --list-langs` output. The first line is a header.
pub fn parse_language_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Requested `+`-separated languages that are not installed.
pub fn missing_languages(requested: &str, available: &[String]) -> Vec<String> {
    requested
        .split(['+', ',', ' '])
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .filter(|lang| !available.iter().any(|a| a == lang))
        .map(str::to_string)
        .collect()
}

/// Fail unless the `+`-separated `language` names the required pack.
pub fn require_language(language: &str) -> Result<(), EngineError> {
    if language.split(['+', ',', ' ']).any(|l| l.trim() == REQUIRED_LANGUAGE) {
        return Ok(());
    }
    Err(EngineError::LanguageNotConfigured {
        language: language.to_string(),
        required: REQUIRED_LANGUAGE,
    })
}

/// OCR backend running one `tesseract` process per page.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: String,
    language: String,
    oem: u32,
    psm: u32,
    dpi: u32,
}

impl TesseractEngine {
    /// Create an engine from configuration.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            command: config.tesseract_cmd.clone(),
            language: config.language.clone(),
            oem: config.oem,
            psm: config.psm,
            dpi: config.dpi,
        }
    }

    fn run(&self, args: &[&str]) -> Result<std::process::Output, EngineError> {
        Command::new(&self.command)
            .args(args)
            .output()
            .map_err(|e| EngineError::NotFound {
                command: self.command.clone(),
                reason: e.to_string(),
            })
    }

    /// Installed language packs.
    pub fn list_languages(&self) -> Result<Vec<String>, EngineError> {
        let output = self.run(&["--list-langs"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Failed(format!(
                "{} --list-langs: {}",
                self.command,
                stderr.trim()
            )));
        }

        // Older releases print the list on stderr
        let stdout = String::from_utf8_lossy(&output.stdout);
        let listing = if stdout.trim().is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            stdout.into_owned()
        };
        Ok(parse_language_list(&listing))
    }

    fn version(&self) -> Result<String, EngineError> {
        let output = self.run(&["--version"])?;
        if !output.status.success() {
            return Err(EngineError::Failed(format!(
                "{} --version exited with {}",
                self.command, output.status
            )));
        }

        let text = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }

    fn recognize_file(&self, path: &Path) -> Result<String, EngineError> {
        let output = Command::new(&self.command)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--oem")
            .arg(self.oem.to_string())
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("--dpi")
            .arg(self.dpi.to_string())
            .output()
            .map_err(|e| EngineError::NotFound {
                command: self.command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Failed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrBackend for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, EngineError> {
        let file = tempfile::Builder::new()
            .prefix("ruanzhu-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| EngineError::Image(e.to_string()))?;

        image
            .save_with_format(file.path(), ImageFormat::Png)
            .map_err(|e| EngineError::Image(e.to_string()))?;

        trace!("Running {} on {}", self.command, file.path().display());
        let text = self.recognize_file(file.path())?;
        debug!("Recognized {} characters", text.chars().count());
        Ok(text)
    }

    fn preflight(&self) -> Result<EngineInfo, EngineError> {
        require_language(&self.language)?;

        let version = self.version()?;
        let languages = self.list_languages()?;

        let missing = missing_languages(&self.language, &languages);
        if !missing.is_empty() {
            return Err(EngineError::MissingLanguage {
                missing: missing.join(", "),
                available: languages.join(", "),
            });
        }

        debug!("Tesseract preflight ok: {}", version);
        Ok(EngineInfo {
            engine: self.name().to_string(),
            version,
            languages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_list() {
        let stdout = "List of available languages in \"/usr/share/tessdata/\" (3):\nchi_sim\neng\nosd\n";
        assert_eq!(parse_language_list(stdout), vec!["chi_sim", "eng", "osd"]);
        assert!(parse_language_list("").is_empty());
    }

    #[test]
    fn test_missing_languages() {
        let available = vec!["chi_sim".to_string(), "eng".to_string()];
        assert!(missing_languages("chi_sim+eng", &available).is_empty());
        assert_eq!(missing_languages("chi_sim+chi_tra", &available), vec!["chi_tra"]);
    }

    #[test]
    fn test_require_language() {
        assert!(require_language("chi_sim").is_ok());
        assert!(require_language("chi_sim+eng").is_ok());
        assert!(matches!(
            require_language("eng"),
            Err(EngineError::LanguageNotConfigured { required: "chi_sim", .. })
        ));
    }

    #[test]
    fn test_preflight_rejects_language_without_chinese() {
        let config = OcrConfig {
            tesseract_cmd: "ruanzhu-no-such-tesseract".to_string(),
            language: "eng".to_string(),
            ..Default::default()
        };
        let engine = TesseractEngine::from_config(&config);

        assert!(matches!(
            engine.preflight(),
            Err(EngineError::LanguageNotConfigured { .. })
        ));
    }

    #[test]
    fn test_missing_executable_is_engine_error() {
        let config = OcrConfig {
            tesseract_cmd: "ruanzhu-no-such-tesseract".to_string(),
            ..Default::default()
        };
        let engine = TesseractEngine::from_config(&config);

        assert!(matches!(
            engine.preflight(),
            Err(EngineError::NotFound { .. })
        ));
        let image = DynamicImage::new_luma8(8, 8);
        assert!(matches!(
            engine.recognize(&image),
            Err(EngineError::NotFound { .. })
        ));
    }
}

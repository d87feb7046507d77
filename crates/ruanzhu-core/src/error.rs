//! Error types for the ruanzhu-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the ruanzhu library.
#[derive(Error, Debug)]
pub enum RuanzhuError {
    /// Source document could not be read or decoded.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// OCR engine failure.
    #[error("OCR engine error: {0}")]
    Engine(#[from] EngineError),

    /// Certificate field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Spreadsheet report could not be written.
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// Whole-batch failure.
    #[error("batch error: {0}")]
    Batch(#[from] BatchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to reading a source document. Fatal for that file only.
#[derive(Error, Debug)]
pub enum InputError {
    /// The file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The path exists but is not a regular file.
    #[error("not a file: {}", .0.display())]
    NotAFile(PathBuf),

    /// The extension is not one of the supported document kinds.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Pdf(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// A page could not be turned into an image.
    #[error("failed to rasterize page {page}: {reason}")]
    Rasterize { page: u32, reason: String },

    /// Image decoding failed.
    #[error("invalid image: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error while reading the document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the OCR engine boundary. Fatal for that page only.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine executable could not be started.
    #[error("OCR engine not found ({command}): {reason}")]
    NotFound { command: String, reason: String },

    /// The configured language does not include the required pack.
    #[error("OCR language {language:?} does not include {required}")]
    LanguageNotConfigured {
        language: String,
        required: &'static str,
    },

    /// Required language packs are not installed.
    #[error("language pack(s) not installed: {missing} (available: {available})")]
    MissingLanguage { missing: String, available: String },

    /// The engine ran but exited unsuccessfully.
    #[error("OCR engine failed: {0}")]
    Failed(String),

    /// The engine produced no text for the page.
    #[error("OCR engine returned no output")]
    NoOutput,

    /// Recognition models could not be loaded.
    #[error("failed to load OCR models: {0}")]
    ModelLoad(String),

    /// The selected engine was not compiled into this build.
    #[error("OCR engine {0:?} is not available in this build")]
    Unavailable(&'static str),

    /// The page image could not be handed to the engine.
    #[error("failed to prepare image for OCR: {0}")]
    Image(String),
}

/// Errors related to certificate field extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A record lacks both load-bearing fields after fallback.
    #[error("record rejected: no software name and no registration number")]
    Rejected,

    /// A correction pair would make the correction table non-idempotent.
    #[error("invalid correction {garbled:?} -> {correct:?}: {reason}")]
    InvalidCorrection {
        garbled: String,
        correct: String,
        reason: String,
    },

    /// Input text was empty.
    #[error("no text to parse")]
    EmptyText,
}

/// Errors related to writing the spreadsheet report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// XML serialization failed.
    #[error("failed to write XML part {part}: {reason}")]
    Xml { part: &'static str, reason: String },

    /// Zip container failure.
    #[error("failed to write workbook archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whole-run batch failures. Everything else is isolated per file or page.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The input directory does not exist or is not a directory.
    #[error("input directory not found: {}", .0.display())]
    NoDirectory(PathBuf),

    /// No supported files were found in the directory.
    #[error("no supported files found in {}", .0.display())]
    NoFiles(PathBuf),

    /// Every file or page failed; nothing was recorded.
    #[error("no records produced from {files} file(s) ({failures} failure(s))")]
    NoRecords { files: usize, failures: usize },

    /// A worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Worker(String),
}

/// Result type for the ruanzhu library.
pub type Result<T> = std::result::Result<T, RuanzhuError>;

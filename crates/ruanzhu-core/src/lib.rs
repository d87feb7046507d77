//! Core library for software-copyright certificate processing.
//!
//! This crate provides:
//! - PDF page rasterization (poppler `pdftoppm` or embedded page scans)
//! - Image preprocessing and OCR adapters over Tesseract and PaddleOCR models
//! - Certificate field extraction with OCR misread correction and a
//!   filename fallback for the software name
//! - Batch aggregation with per-file failure isolation
//! - Styled `.xlsx` report generation

pub mod batch;
pub mod certificate;
pub mod error;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod report;

pub use batch::{BatchAggregator, BatchResult, BatchSummary, DocumentPipeline, FailureEntry};
pub use certificate::{CertificateParser, CorrectionTable, RuleSet};
pub use error::{RuanzhuError, Result};
pub use models::{ExtractedRecord, Field, RuanzhuConfig, SourceDocument};
pub use ocr::{create_engine, OcrBackend, TesseractEngine};
#[cfg(feature = "paddle")]
pub use ocr::PaddleEngine;
pub use pdf::{create_rasterizer, PageRasterizer};
pub use report::ReportBuilder;

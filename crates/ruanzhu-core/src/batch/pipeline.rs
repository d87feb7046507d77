//! Per-document pipeline: rasterize, preprocess, recognize, parse.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::certificate::CertificateParser;
use crate::error::{EngineError, ExtractionError, InputError, RuanzhuError};
use crate::models::{DocumentFormat, ExtractedRecord, RuanzhuConfig, SourceDocument};
use crate::ocr::{create_engine, ImagePreprocessor, OcrBackend};
use crate::pdf::{create_rasterizer, PageRasterizer, RasterizedPage};

use super::result::{FailureEntry, FailureKind};

/// What happened to one page.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    /// A record was accepted.
    Accepted(ExtractedRecord),
    /// Text was recognized but the record lacked both load-bearing fields.
    Rejected(String),
    /// The page never produced text.
    Failed { kind: FailureKind, reason: String },
}

/// Outcome of one page, located within its document.
#[derive(Debug, Clone)]
pub struct PageResult {
    /// 1-based page number; `None` for single-image documents and
    /// whole-file failures.
    pub page: Option<u32>,
    pub outcome: PageOutcome,
}

impl PageResult {
    /// Failure entry for a non-accepted page.
    pub fn failure(&self, path: &std::path::Path) -> Option<FailureEntry> {
        let (kind, reason) = match &self.outcome {
            PageOutcome::Accepted(_) => return None,
            PageOutcome::Rejected(reason) => (FailureKind::Rejected, reason.clone()),
            PageOutcome::Failed { kind, reason } => (*kind, reason.clone()),
        };
        Some(FailureEntry {
            path: path.to_path_buf(),
            page: self.page,
            kind,
            reason,
        })
    }
}

/// Outcome of one source file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// Pages found in the document, when it could be opened.
    pub page_count: Option<u32>,
    pub pages: Vec<PageResult>,
}

impl FileOutcome {
    fn file_failure(path: PathBuf, kind: FailureKind, reason: String) -> Self {
        Self {
            path,
            page_count: None,
            pages: vec![PageResult {
                page: None,
                outcome: PageOutcome::Failed { kind, reason },
            }],
        }
    }

    /// Accepted records in page order.
    pub fn records(&self) -> impl Iterator<Item = &ExtractedRecord> {
        self.pages.iter().filter_map(|p| match &p.outcome {
            PageOutcome::Accepted(record) => Some(record),
            _ => None,
        })
    }

    /// Failures in page order.
    pub fn failures(&self) -> impl Iterator<Item = FailureEntry> + '_ {
        self.pages.iter().filter_map(|p| p.failure(&self.path))
    }
}

/// Recognized text of one page.
#[derive(Debug)]
pub struct PageText {
    pub number: u32,
    pub text: Result<String, RuanzhuError>,
}

/// Runs one source document through the full pipeline.
pub struct DocumentPipeline {
    ocr: Arc<dyn OcrBackend>,
    rasterizer: Arc<dyn PageRasterizer>,
    preprocessor: ImagePreprocessor,
    parser: CertificateParser,
    max_pages: u32,
}

impl DocumentPipeline {
    pub fn new(ocr: Arc<dyn OcrBackend>, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        Self {
            ocr,
            rasterizer,
            preprocessor: ImagePreprocessor::new(),
            parser: CertificateParser::new(),
            max_pages: 0,
        }
    }

    /// Build the pipeline described by `config`. Engine construction
    /// failures surface as `RuanzhuError::Engine`.
    pub fn from_config(config: &RuanzhuConfig) -> Result<Self, RuanzhuError> {
        let ocr = create_engine(config)?;
        let rasterizer: Arc<dyn PageRasterizer> = Arc::from(create_rasterizer(&config.pdf));
        let parser = CertificateParser::from_config(&config.extraction)
            .map_err(|e| RuanzhuError::Config(e.to_string()))?;

        Ok(Self::new(ocr, rasterizer)
            .with_parser(parser)
            .with_max_pages(config.pdf.max_pages))
    }

    pub fn with_parser(mut self, parser: CertificateParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn ocr(&self) -> &dyn OcrBackend {
        self.ocr.as_ref()
    }

    /// Split a document into page images.
    pub fn load_pages(&self, doc: &SourceDocument) -> Result<Vec<RasterizedPage>, InputError> {
        match doc.format {
            DocumentFormat::Pdf => self.rasterizer.rasterize(&doc.path, self.max_pages),
            DocumentFormat::Image => {
                let image = image::open(&doc.path)?;
                Ok(vec![RasterizedPage::ok(1, image)])
            }
        }
    }

    /// Preprocess and recognize one page image. Blank output is an engine
    /// failure.
    pub fn recognize(&self, image: &image::DynamicImage) -> Result<String, EngineError> {
        let normalized = self.preprocessor.process(image);
        let text = self.ocr.recognize(&normalized)?;
        if text.trim().is_empty() {
            return Err(EngineError::NoOutput);
        }
        Ok(text)
    }

    /// Recognized text of every page, without parsing.
    pub fn extract_text(&self, doc: &SourceDocument) -> Result<Vec<PageText>, InputError> {
        let pages = self.load_pages(doc)?;
        Ok(pages
            .into_iter()
            .map(|page| PageText {
                number: page.number,
                text: page
                    .image
                    .map_err(RuanzhuError::from)
                    .and_then(|image| self.recognize(&image).map_err(RuanzhuError::from)),
            })
            .collect())
    }

    /// Process a document into per-page outcomes. Never fails as a whole;
    /// problems become failure outcomes.
    pub fn process(&self, doc: &SourceDocument) -> FileOutcome {
        info!("Processing {}", doc.path.display());

        let pages = match self.load_pages(doc) {
            Ok(pages) => pages,
            Err(e) => {
                warn!("Failed to read {}: {}", doc.path.display(), e);
                return FileOutcome::file_failure(doc.path.clone(), FailureKind::Input, e.to_string());
            }
        };

        let multi_page = doc.format == DocumentFormat::Pdf;
        let page_count = pages.len() as u32;
        let results = pages
            .into_iter()
            .map(|page| {
                let number = page.number;
                let outcome = self.process_page(doc, page);
                PageResult {
                    page: multi_page.then_some(number),
                    outcome,
                }
            })
            .collect();

        FileOutcome {
            path: doc.path.clone(),
            page_count: Some(page_count),
            pages: results,
        }
    }

    fn process_page(&self, doc: &SourceDocument, page: RasterizedPage) -> PageOutcome {
        let image = match page.image {
            Ok(image) => image,
            Err(e) => {
                warn!("{} page {}: {}", doc.path.display(), page.number, e);
                return PageOutcome::Failed {
                    kind: FailureKind::Input,
                    reason: e.to_string(),
                };
            }
        };

        let text = match self.recognize(&image) {
            Ok(text) => text,
            Err(e) => {
                warn!("{} page {}: {}", doc.path.display(), page.number, e);
                return PageOutcome::Failed {
                    kind: FailureKind::Engine,
                    reason: e.to_string(),
                };
            }
        };
        debug!("Page {} of {}: {} characters", page.number, doc.path.display(), text.len());

        match self.parser.parse(&text, Some(&doc.path)) {
            Ok(record) => PageOutcome::Accepted(record),
            Err(ExtractionError::EmptyText) => PageOutcome::Failed {
                kind: FailureKind::Engine,
                reason: EngineError::NoOutput.to_string(),
            },
            Err(e) => {
                warn!("{} page {}: {}", doc.path.display(), page.number, e);
                PageOutcome::Rejected(e.to_string())
            }
        }
    }
}

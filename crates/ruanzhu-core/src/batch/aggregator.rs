//! Drives the pipeline over many files with per-file failure isolation.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::BatchError;
use crate::models::SourceDocument;

use super::discover;
use super::pipeline::{DocumentPipeline, FileOutcome, PageOutcome, PageResult};
use super::result::{BatchResult, FailureKind};

/// Called once per finished file.
pub type ProgressFn = Arc<dyn Fn(&FileOutcome) + Send + Sync>;

/// Runs a [`DocumentPipeline`] across a batch of documents.
///
/// Files run on blocking worker threads, at most `jobs` at a time. Results
/// are collected in input order regardless of completion order, then
/// renumbered once all workers are done.
pub struct BatchAggregator {
    pipeline: Arc<DocumentPipeline>,
    jobs: usize,
    cancel: Arc<AtomicBool>,
    progress: Option<ProgressFn>,
}

impl BatchAggregator {
    pub fn new(pipeline: Arc<DocumentPipeline>) -> Self {
        Self {
            pipeline,
            jobs: 1,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    /// Maximum files processed concurrently (at least 1).
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Flag that stops dispatching new files once set. Files already
    /// running finish normally.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Discover files in `dir` and process them.
    pub async fn run_dir<S: AsRef<str>>(
        &self,
        dir: &Path,
        extensions: &[S],
    ) -> Result<BatchResult, BatchError> {
        let documents = discover(dir, extensions)?;
        info!("Found {} file(s) in {}", documents.len(), dir.display());
        Ok(self.run(documents).await)
    }

    /// Process `documents` and aggregate their outcomes.
    pub async fn run(&self, documents: Vec<SourceDocument>) -> BatchResult {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let mut tasks = JoinSet::new();
        let total = documents.len();

        for (index, doc) in documents.into_iter().enumerate() {
            let pipeline = Arc::clone(&self.pipeline);
            let semaphore = Arc::clone(&semaphore);
            let cancel = Arc::clone(&self.cancel);

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, None);
                };
                if cancel.load(Ordering::SeqCst) {
                    debug!("Cancelled before {}", doc.path.display());
                    return (index, None);
                }

                let path = doc.path.clone();
                let outcome = tokio::task::spawn_blocking(move || pipeline.process(&doc))
                    .await
                    .unwrap_or_else(|e| worker_failure(&path, &e.to_string()));
                (index, Some(outcome))
            });
        }

        let mut outcomes: Vec<Option<FileOutcome>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if let (Some(progress), Some(outcome)) = (&self.progress, &outcome) {
                        progress(outcome);
                    }
                    outcomes[index] = outcome;
                }
                Err(e) => warn!("Batch task failed: {}", e),
            }
        }

        let mut result = collect(outcomes);
        result.elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            "Batch finished: {} record(s), {} failure(s) from {} file(s) in {} ms",
            result.records.len(),
            result.failures.len(),
            result.files,
            result.elapsed_ms
        );
        result
    }
}

fn worker_failure(path: &Path, reason: &str) -> FileOutcome {
    FileOutcome {
        path: path.to_path_buf(),
        page_count: None,
        pages: vec![PageResult {
            page: None,
            outcome: PageOutcome::Failed {
                kind: FailureKind::Worker,
                reason: reason.to_string(),
            },
        }],
    }
}

/// Fold file outcomes, in input order, into a renumbered result.
fn collect(outcomes: Vec<Option<FileOutcome>>) -> BatchResult {
    let mut result = BatchResult::default();

    for outcome in outcomes {
        let Some(outcome) = outcome else {
            result.skipped += 1;
            continue;
        };

        result.files += 1;
        result.pages += outcome.page_count.unwrap_or(0) as usize;
        result.records.extend(outcome.records().cloned());
        result.failures.extend(outcome.failures());
    }

    result.renumber();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use image::DynamicImage;
    use pretty_assertions::assert_eq;

    use crate::certificate::CertificateParser;
    use crate::error::{EngineError, InputError};
    use crate::models::NameSource;
    use crate::ocr::{EngineInfo, OcrBackend};
    use crate::pdf::{PageRasterizer, RasterizedPage};

    /// Recognizes pages by image width.
    struct FakeOcr {
        texts: HashMap<u32, Result<&'static str, &'static str>>,
    }

    impl OcrBackend for FakeOcr {
        fn name(&self) -> &str {
            "fake"
        }

        fn recognize(&self, image: &DynamicImage) -> Result<String, EngineError> {
            match self.texts.get(&image.width()) {
                Some(Ok(text)) => Ok(text.to_string()),
                Some(Err(reason)) => Err(EngineError::Failed(reason.to_string())),
                None => Ok(String::new()),
            }
        }

        fn preflight(&self) -> Result<EngineInfo, EngineError> {
            Ok(EngineInfo {
                engine: "fake".to_string(),
                version: "0".to_string(),
                languages: vec!["chi_sim".to_string()],
            })
        }
    }

    /// Produces one blank page per listed width, keyed by file name.
    struct FakeRasterizer {
        pages: HashMap<&'static str, Vec<u32>>,
    }

    impl PageRasterizer for FakeRasterizer {
        fn name(&self) -> &str {
            "fake"
        }

        fn rasterize(&self, path: &Path, _max_pages: u32) -> Result<Vec<RasterizedPage>, InputError> {
            let name = path.file_name().unwrap().to_string_lossy();
            let widths = self
                .pages
                .get(name.as_ref())
                .ok_or_else(|| InputError::Pdf("unreadable".to_string()))?;
            Ok(widths
                .iter()
                .enumerate()
                .map(|(i, &w)| RasterizedPage::ok(i as u32 + 1, DynamicImage::new_luma8(w, 2)))
                .collect())
        }
    }

    const FULL: &str = "No. 00000042\n软件名称：悬浮窗管理系统\n著作权人：某某科技有限公司\n\
        首次发表日期：2021年3月15日\n权利取得方式：原始取得\n权利范围：全部权利\n登记号：2021SR123456";
    const NO_NAME: &str = "著作权人：某某科技有限公司\n首次发表日期:未 发表\n登记号：2022SR654321";
    const NOTHING: &str = "著作权人：某某科技有限公司";

    fn pipeline(
        texts: Vec<(u32, Result<&'static str, &'static str>)>,
        pages: Vec<(&'static str, Vec<u32>)>,
    ) -> DocumentPipeline {
        DocumentPipeline::new(
            Arc::new(FakeOcr {
                texts: texts.into_iter().collect(),
            }),
            Arc::new(FakeRasterizer {
                pages: pages.into_iter().collect(),
            }),
        )
    }

    fn touch(dir: &Path, name: &str) -> SourceDocument {
        let path = dir.join(name);
        std::fs::write(&path, b"%PDF-1.5").unwrap();
        SourceDocument::open(path).unwrap()
    }

    #[tokio::test]
    async fn test_three_page_pdf_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let doc = touch(dir.path(), "cert2_设计工具V2.pdf");
        let pipeline = pipeline(
            vec![(1, Ok(FULL)), (2, Ok(NO_NAME)), (3, Err("image unreadable"))],
            vec![("cert2_设计工具V2.pdf", vec![1, 2, 3])],
        );

        let result = BatchAggregator::new(Arc::new(pipeline)).run(vec![doc]).await;

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].serial, 1);
        assert_eq!(result.records[0].software_name, "悬浮窗管理系统");
        assert_eq!(result.records[0].notes, "原序号: 00000042");
        assert_eq!(result.records[1].serial, 2);
        assert_eq!(result.records[1].software_name, "cert2_设计工具V2");
        assert_eq!(result.records[1].name_source, NameSource::Filename);
        assert_eq!(result.records[1].first_publication_date, "未发表");

        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].page, Some(3));
        assert_eq!(result.failures[0].kind, FailureKind::Engine);
        assert!(result.failures[0].path.ends_with("cert2_设计工具V2.pdf"));
        assert_eq!(result.pages, 3);
        assert!(result.check().is_ok());
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_serials_renumbered() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![
            touch(dir.path(), "a.pdf"),
            touch(dir.path(), "b.pdf"),
            touch(dir.path(), "c.pdf"),
            touch(dir.path(), "d.pdf"),
        ];

        for jobs in [1, 3] {
            let pipeline = pipeline(
                vec![(10, Ok(FULL)), (11, Ok(NO_NAME)), (12, Ok(FULL))],
                vec![("a.pdf", vec![10, 11]), ("c.pdf", vec![99]), ("d.pdf", vec![12])],
            );
            let result = BatchAggregator::new(Arc::new(pipeline))
                .with_jobs(jobs)
                .run(docs.clone())
                .await;

            let serials: Vec<u32> = result.records.iter().map(|r| r.serial).collect();
            assert_eq!(serials, vec![1, 2, 3]);
            assert_eq!(result.records[1].software_name, "a");
            assert_eq!(result.records[2].registration_number, "2021SR123456");

            // b.pdf cannot be read, c.pdf yields no text
            let failed: Vec<(String, Option<u32>, FailureKind)> = result
                .failures
                .iter()
                .map(|f| (f.path.file_name().unwrap().to_string_lossy().into_owned(), f.page, f.kind))
                .collect();
            assert_eq!(
                failed,
                vec![
                    ("b.pdf".to_string(), None, FailureKind::Input),
                    ("c.pdf".to_string(), Some(1), FailureKind::Engine),
                ]
            );
            assert_eq!(result.files, 4);
        }
    }

    #[tokio::test]
    async fn test_rejected_record_goes_to_failures() {
        let dir = tempfile::tempdir().unwrap();
        let doc = touch(dir.path(), "scan.pdf");
        let pipeline = pipeline(vec![(5, Ok(NOTHING))], vec![("scan.pdf", vec![5])])
            .with_parser(CertificateParser::new().with_filename_fallback(false));

        let result = BatchAggregator::new(Arc::new(pipeline)).run(vec![doc]).await;

        assert!(result.records.is_empty());
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].kind, FailureKind::Rejected);
        assert!(matches!(
            result.check(),
            Err(BatchError::NoRecords { files: 1, failures: 1 })
        ));
    }

    #[tokio::test]
    async fn test_image_file_has_no_page_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("数据采集平台.png");
        DynamicImage::new_luma8(7, 3).save(&path).unwrap();
        let doc = SourceDocument::open(&path).unwrap();

        let pipeline = pipeline(vec![(7, Ok(NO_NAME))], vec![]);
        let result = BatchAggregator::new(Arc::new(pipeline)).run(vec![doc]).await;

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].software_name, "数据采集平台");
        assert_eq!(result.records[0].registration_number, "2022SR654321");
        assert_eq!(result.pages, 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![touch(dir.path(), "a.pdf"), touch(dir.path(), "b.pdf")];
        let pipeline = pipeline(vec![(1, Ok(FULL))], vec![("a.pdf", vec![1]), ("b.pdf", vec![1])]);

        let aggregator = BatchAggregator::new(Arc::new(pipeline));
        aggregator.cancel_flag().store(true, Ordering::SeqCst);
        let result = aggregator.run(docs).await;

        assert_eq!(result.files, 0);
        assert_eq!(result.skipped, 2);
        assert!(result.records.is_empty());
    }

    #[tokio::test]
    async fn test_progress_called_per_file() {
        use std::sync::atomic::AtomicUsize;

        let dir = tempfile::tempdir().unwrap();
        let docs = vec![touch(dir.path(), "a.pdf"), touch(dir.path(), "b.pdf")];
        let pipeline = pipeline(vec![(1, Ok(FULL))], vec![("a.pdf", vec![1])]);

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let result = BatchAggregator::new(Arc::new(pipeline))
            .with_jobs(2)
            .with_progress(Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .run(docs)
            .await;

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(result.records.len(), 1);
    }
}

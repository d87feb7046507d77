//! Batch processing over a directory of certificates.
//!
//! Directory scanning is shallow: only files directly inside the input
//! directory are considered, in path order.

mod aggregator;
mod pipeline;
mod result;

pub use aggregator::{BatchAggregator, ProgressFn};
pub use pipeline::{DocumentPipeline, FileOutcome, PageOutcome, PageResult, PageText};
pub use result::{renumber, BatchResult, BatchSummary, FailureEntry, FailureKind};

use std::path::Path;

use tracing::debug;

use crate::error::BatchError;
use crate::models::SourceDocument;

/// File extensions picked up by default.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Collect candidate source files directly inside `dir`, sorted by path.
pub fn discover<S: AsRef<str>>(
    dir: &Path,
    extensions: &[S],
) -> Result<Vec<SourceDocument>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::NoDirectory(dir.to_path_buf()));
    }

    let entries = std::fs::read_dir(dir).map_err(|_| BatchError::NoDirectory(dir.to_path_buf()))?;
    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.iter().any(|ext| ext.as_ref().eq_ignore_ascii_case(e)))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let documents: Vec<SourceDocument> = paths
        .into_iter()
        .filter_map(|path| match SourceDocument::open(&path) {
            Ok(doc) => Some(doc),
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    if documents.is_empty() {
        return Err(BatchError::NoFiles(dir.to_path_buf()));
    }

    debug!("Discovered {} file(s) in {}", documents.len(), dir.display());
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_is_shallow_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.png"), b"").unwrap();
        std::fs::write(dir.path().join("a.PDF"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.pdf"), b"").unwrap();

        let docs = discover(dir.path(), SUPPORTED_EXTENSIONS).unwrap();
        let names: Vec<String> = docs.iter().map(|d| d.file_name()).collect();
        assert_eq!(names, vec!["a.PDF", "b.png"]);
    }

    #[test]
    fn test_discover_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover(dir.path(), SUPPORTED_EXTENSIONS),
            Err(BatchError::NoFiles(_))
        ));

        assert!(matches!(
            discover(&dir.path().join("missing"), SUPPORTED_EXTENSIONS),
            Err(BatchError::NoDirectory(_))
        ));
    }

    #[test]
    fn test_discover_respects_extension_list() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"").unwrap();
        std::fs::write(dir.path().join("b.png"), b"").unwrap();

        let docs = discover(dir.path(), &["png"]).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].file_name(), "b.png");
    }
}

//! Batch accumulator: accepted records plus per-file/page failures.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::BatchError;
use crate::models::{ExtractedRecord, NameSource};

/// Why a file or page produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Missing, unreadable or unsupported document, or an undecodable page.
    Input,
    /// OCR engine absent, crashed or returned nothing.
    Engine,
    /// Neither software name nor registration number could be resolved.
    Rejected,
    /// The worker processing the file died.
    Worker,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Input => "input",
            FailureKind::Engine => "engine",
            FailureKind::Rejected => "rejected",
            FailureKind::Worker => "worker",
        };
        f.write_str(s)
    }
}

/// A failure located at file or page granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    /// Source file.
    pub path: PathBuf,
    /// 1-based page for multi-page documents; `None` for the whole file.
    pub page: Option<u32>,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable reason.
    pub reason: String,
}

impl fmt::Display for FailureEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(page) => write!(f, "{} (page {}): {}", self.path.display(), page, self.reason),
            None => write!(f, "{}: {}", self.path.display(), self.reason),
        }
    }
}

/// Replace serials with 1..N in slice order.
pub fn renumber(records: &mut [ExtractedRecord]) {
    for (i, record) in records.iter_mut().enumerate() {
        record.serial = i as u32 + 1;
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    /// Accepted records, serials 1..N once finalized.
    pub records: Vec<ExtractedRecord>,
    /// Per-file and per-page failures.
    pub failures: Vec<FailureEntry>,
    /// Files processed.
    pub files: usize,
    /// Pages that went through OCR or failed on the way there.
    pub pages: usize,
    /// Files not started because the run was cancelled.
    pub skipped: usize,
    /// Wall-clock time of the run.
    pub elapsed_ms: u64,
}

impl BatchResult {
    /// Assign serials 1..N in production order.
    pub fn renumber(&mut self) {
        renumber(&mut self.records);
    }

    /// Fail when the whole run produced nothing.
    pub fn check(&self) -> Result<(), BatchError> {
        if self.records.is_empty() {
            return Err(BatchError::NoRecords {
                files: self.files,
                failures: self.failures.len(),
            });
        }
        Ok(())
    }

    /// Counts for the run summary.
    pub fn summary(&self) -> BatchSummary {
        let count = |kind: FailureKind| self.failures.iter().filter(|f| f.kind == kind).count();

        BatchSummary {
            files: self.files,
            pages: self.pages,
            records: self.records.len(),
            failures: self.failures.len(),
            rejected: count(FailureKind::Rejected),
            input_errors: count(FailureKind::Input),
            engine_errors: count(FailureKind::Engine),
            filename_fallbacks: self
                .records
                .iter()
                .filter(|r| r.name_source == NameSource::Filename)
                .count(),
            skipped: self.skipped,
            elapsed_ms: self.elapsed_ms,
        }
    }
}

/// Machine-readable run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub files: usize,
    pub pages: usize,
    pub records: usize,
    pub failures: usize,
    pub rejected: usize,
    pub input_errors: usize,
    pub engine_errors: usize,
    pub filename_fallbacks: usize,
    pub skipped: usize,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(notes: &str) -> ExtractedRecord {
        ExtractedRecord {
            serial: 99,
            software_name: "悬浮窗管理系统".to_string(),
            notes: notes.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_renumber_is_gap_free() {
        let mut result = BatchResult {
            records: vec![record("原序号: 7"), record(""), record("原序号: 7")],
            ..Default::default()
        };
        result.renumber();

        let serials: Vec<u32> = result.records.iter().map(|r| r.serial).collect();
        assert_eq!(serials, vec![1, 2, 3]);
        assert_eq!(result.records[0].notes, "原序号: 7");
    }

    #[test]
    fn test_check_requires_records() {
        let result = BatchResult {
            files: 2,
            failures: vec![FailureEntry {
                path: PathBuf::from("a.pdf"),
                page: Some(1),
                kind: FailureKind::Engine,
                reason: "OCR engine returned no output".to_string(),
            }],
            ..Default::default()
        };
        assert!(matches!(
            result.check(),
            Err(BatchError::NoRecords { files: 2, failures: 1 })
        ));
    }

    #[test]
    fn test_failure_display() {
        let entry = FailureEntry {
            path: PathBuf::from("certs/a.pdf"),
            page: Some(3),
            kind: FailureKind::Engine,
            reason: "crashed".to_string(),
        };
        assert_eq!(entry.to_string(), "certs/a.pdf (page 3): crashed");
    }
}

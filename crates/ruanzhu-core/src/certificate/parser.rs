//! Certificate parser: corrections, rules, cleaning and filename fallback.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::models::config::ExtractionConfig;
use crate::models::{ExtractedRecord, Field, FieldCandidate, NameSource};

use super::cleaner::normalize_field;
use super::fallback::{name_from_filename, needs_fallback};
use super::rules::{CorrectionTable, RuleSet, PAGE_DELIMITER};
use super::MIN_SOFTWARE_NAME_CHARS;

/// Delimiter written between pages of multi-page extracted text.
pub fn page_delimiter(page: u32) -> String {
    format!("--- Page {} ---", page)
}

/// Join per-page text with page delimiters (pages are 1-based).
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}\n{}", page_delimiter(i as u32 + 1), text.as_ref().trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Split page-delimited text back into pages, dropping blank ones.
pub fn split_pages(text: &str) -> Vec<String> {
    PAGE_DELIMITER
        .split(text)
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses raw certificate text into a validated record.
#[derive(Debug, Clone)]
pub struct CertificateParser {
    rules: RuleSet,
    corrections: CorrectionTable,
    min_name_chars: usize,
    filename_fallback: bool,
}

impl CertificateParser {
    /// Create a parser with the built-in rules and corrections.
    pub fn new() -> Self {
        Self {
            rules: RuleSet::default_rules(),
            corrections: CorrectionTable::builtin(),
            min_name_chars: MIN_SOFTWARE_NAME_CHARS,
            filename_fallback: true,
        }
    }

    /// Create a parser from configuration, merging extra correction pairs.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractionError> {
        let corrections = CorrectionTable::builtin().with_pairs(
            config
                .extra_corrections
                .iter()
                .map(|(g, c)| (g.clone(), c.clone())),
        )?;

        Ok(Self::new()
            .with_corrections(corrections)
            .with_min_name_chars(config.min_name_chars)
            .with_filename_fallback(config.filename_fallback))
    }

    /// Replace the correction table.
    pub fn with_corrections(mut self, corrections: CorrectionTable) -> Self {
        self.corrections = corrections;
        self
    }

    /// Set the minimum software-name length below which the fallback applies.
    pub fn with_min_name_chars(mut self, chars: usize) -> Self {
        self.min_name_chars = chars;
        self
    }

    /// Enable or disable the filename fallback.
    pub fn with_filename_fallback(mut self, enabled: bool) -> Self {
        self.filename_fallback = enabled;
        self
    }

    pub fn corrections(&self) -> &CorrectionTable {
        &self.corrections
    }

    /// Correct OCR misreads, then resolve every field.
    pub fn extract(&self, text: &str) -> Vec<FieldCandidate> {
        let corrected = self.corrections.apply(text);
        self.rules.extract_all(&corrected)
    }

    /// Parse one page of text into a record.
    ///
    /// `source` is the file the text came from and feeds the filename
    /// fallback. The returned record has serial 0 until the batch
    /// renumbers it.
    pub fn parse(
        &self,
        text: &str,
        source: Option<&Path>,
    ) -> Result<ExtractedRecord, ExtractionError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyText);
        }

        let mut record = ExtractedRecord::default();
        let mut printed_serial = None;

        for candidate in self.extract(text) {
            let Some(value) = normalize_field(candidate.field, &candidate.raw) else {
                debug!(
                    "Discarded {} from {}: {:?}",
                    candidate.field, candidate.rule_id, candidate.raw
                );
                continue;
            };

            match candidate.field {
                Field::Serial => printed_serial = Some(value),
                Field::CopyrightOwner => record.copyright_owner = value,
                Field::SoftwareName => record.software_name = value,
                Field::FirstPublicationDate => record.first_publication_date = value,
                Field::AcquisitionMethod => record.acquisition_method = value,
                Field::RightsScope => record.rights_scope = value,
                Field::RegistrationNumber => record.registration_number = value,
            }
        }

        let resolved = record.resolved_fields() + usize::from(printed_serial.is_some());
        info!("Extracted {}/{} fields", resolved, Field::ALL.len());

        if let Some(serial) = printed_serial {
            record.notes = format!("原序号: {}", serial);
        }

        self.apply_fallback(&mut record, source);

        if !record.is_viable() {
            return Err(ExtractionError::Rejected);
        }

        Ok(record)
    }

    /// Parse page-delimited text, one result per non-empty page.
    pub fn parse_pages(
        &self,
        text: &str,
        source: Option<&Path>,
    ) -> Vec<Result<ExtractedRecord, ExtractionError>> {
        split_pages(text)
            .iter()
            .map(|page| self.parse(page, source))
            .collect()
    }

    fn apply_fallback(&self, record: &mut ExtractedRecord, source: Option<&Path>) {
        if !self.filename_fallback || !needs_fallback(&record.software_name, self.min_name_chars) {
            return;
        }
        let Some(path) = source else {
            return;
        };

        if let Some(name) = name_from_filename(path) {
            warn!(
                "Using filename fallback for software name: {} (recognized {:?})",
                name, record.software_name
            );
            record.software_name = name;
            record.name_source = NameSource::Filename;
        }
    }
}

impl Default for CertificateParser {
    fn default() -> Self {
        Self::new()
    }
}

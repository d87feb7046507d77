//! Certificate record data models.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// A target field on a software-copyright certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Certificate serial printed on the document (序号 / No.).
    Serial,
    /// Copyright owner (著作权人).
    CopyrightOwner,
    /// Software name (软件名称).
    SoftwareName,
    /// First publication date (首次发表日期).
    FirstPublicationDate,
    /// Acquisition method (权利取得方式).
    AcquisitionMethod,
    /// Rights scope (权利范围).
    RightsScope,
    /// Registration number (登记号).
    RegistrationNumber,
}

impl Field {
    /// All fields in report column order.
    pub const ALL: [Field; 7] = [
        Field::Serial,
        Field::CopyrightOwner,
        Field::SoftwareName,
        Field::FirstPublicationDate,
        Field::AcquisitionMethod,
        Field::RightsScope,
        Field::RegistrationNumber,
    ];

    /// Label as printed on the certificate.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Serial => "序号",
            Field::CopyrightOwner => "著作权人",
            Field::SoftwareName => "软件名称",
            Field::FirstPublicationDate => "首次发表日期",
            Field::AcquisitionMethod => "权利取得方式",
            Field::RightsScope => "权利范围",
            Field::RegistrationNumber => "登记号",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single rule match for a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCandidate {
    /// Field the match belongs to.
    pub field: Field,
    /// Raw matched text, before cleaning.
    pub raw: String,
    /// Identifier of the rule that produced the match.
    pub rule_id: &'static str,
}

/// Where the software name of a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSource {
    /// Recognized from the certificate text.
    #[default]
    Ocr,
    /// Derived from the source file name.
    Filename,
}

/// One accepted certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Sequential number assigned during aggregation (1-based).
    #[serde(default)]
    pub serial: u32,

    /// Copyright owner.
    #[serde(default)]
    pub copyright_owner: String,

    /// Software name.
    #[serde(default)]
    pub software_name: String,

    /// First publication date: `YYYY年MM月DD日` or `未发表`.
    #[serde(default)]
    pub first_publication_date: String,

    /// Acquisition method.
    #[serde(default)]
    pub acquisition_method: String,

    /// Rights scope.
    #[serde(default)]
    pub rights_scope: String,

    /// Registration number (`YYYYSRxxxxxx`).
    #[serde(default)]
    pub registration_number: String,

    /// Free-form notes; carries the serial printed on the certificate.
    #[serde(default)]
    pub notes: String,

    /// Provenance of `software_name`.
    #[serde(skip)]
    pub name_source: NameSource,
}

impl ExtractedRecord {
    /// A record needs a software name or a registration number to identify
    /// the certificate.
    pub fn is_viable(&self) -> bool {
        !self.software_name.is_empty() || !self.registration_number.is_empty()
    }

    /// Number of non-empty fields, excluding the assigned serial.
    pub fn resolved_fields(&self) -> usize {
        [
            &self.copyright_owner,
            &self.software_name,
            &self.first_publication_date,
            &self.acquisition_method,
            &self.rights_scope,
            &self.registration_number,
        ]
        .iter()
        .filter(|v| !v.is_empty())
        .count()
    }
}

/// Kind of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// PDF, one certificate per page.
    Pdf,
    /// Single raster image.
    Image,
}

impl DocumentFormat {
    /// Classify a path by extension.
    pub fn from_path(path: &Path) -> Result<Self, InputError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "png" | "jpg" | "jpeg" | "bmp" | "tif" | "tiff" => Ok(DocumentFormat::Image),
            _ => Err(InputError::UnsupportedFormat(if ext.is_empty() {
                path.display().to_string()
            } else {
                format!(".{}", ext)
            })),
        }
    }
}

/// A discovered input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// File path (identity).
    pub path: PathBuf,
    /// Document kind.
    pub format: DocumentFormat,
}

impl SourceDocument {
    /// Validate a path and classify it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, InputError> {
        let path = path.into();
        if !path.exists() {
            return Err(InputError::NotFound(path));
        }
        if !path.is_file() {
            return Err(InputError::NotAFile(path));
        }
        let format = DocumentFormat::from_path(&path)?;
        Ok(Self { path, format })
    }

    /// File name without directories, for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_format_from_path() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/证书.PDF")).unwrap(),
            DocumentFormat::Pdf
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("scan.tiff")).unwrap(),
            DocumentFormat::Image
        );
        assert!(matches!(
            DocumentFormat::from_path(Path::new("notes.docx")),
            Err(InputError::UnsupportedFormat(ext)) if ext == ".docx"
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let err = SourceDocument::open("/nonexistent/cert.pdf").unwrap_err();
        assert!(matches!(err, InputError::NotFound(_)));
    }

    #[test]
    fn test_record_is_viable() {
        assert!(!ExtractedRecord::default().is_viable());

        let named = ExtractedRecord {
            software_name: "悬浮窗管理系统".to_string(),
            ..Default::default()
        };
        let registered = ExtractedRecord {
            registration_number: "2021SR123456".to_string(),
            ..Default::default()
        };
        let owner_only = ExtractedRecord {
            copyright_owner: "某某科技有限公司".to_string(),
            ..Default::default()
        };

        assert!(named.is_viable());
        assert!(registered.is_viable());
        assert!(!owner_only.is_viable());
    }

    #[test]
    fn test_record_json_omits_provenance() {
        let record = ExtractedRecord {
            serial: 1,
            software_name: "某某管理系统".to_string(),
            name_source: NameSource::Filename,
            ..Default::default()
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["software_name"], "某某管理系统");
        assert!(json.get("name_source").is_none());

        let back: ExtractedRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.name_source, NameSource::Ocr);
    }
}

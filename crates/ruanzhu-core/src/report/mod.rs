//! Spreadsheet report of accepted certificate records.

mod xlsx;

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tracing::info;

use crate::error::ReportError;
use crate::models::config::ReportConfig;
use crate::models::ExtractedRecord;

/// Horizontal alignment of a report column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Center,
    Left,
}

/// One report column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub header: &'static str,
    /// Width in character units.
    pub width: f64,
    pub align: Align,
}

/// Report columns in order.
pub const COLUMNS: [Column; 8] = [
    Column { header: "序号", width: 8.0, align: Align::Center },
    Column { header: "著作权人", width: 30.0, align: Align::Left },
    Column { header: "软件名称", width: 50.0, align: Align::Left },
    Column { header: "首次发表日期", width: 18.0, align: Align::Center },
    Column { header: "权利取得方式", width: 15.0, align: Align::Left },
    Column { header: "权利范围", width: 12.0, align: Align::Left },
    Column { header: "登记号", width: 20.0, align: Align::Center },
    Column { header: "备注", width: 20.0, align: Align::Left },
];

/// Default worksheet title.
pub const DEFAULT_SHEET_NAME: &str = "软件著作权清单";

/// A cell value as written to the sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue<'a> {
    Number(u32),
    Text(&'a str),
}

/// Row values of a record, in column order.
pub fn row_values(record: &ExtractedRecord) -> [CellValue<'_>; 8] {
    [
        CellValue::Number(record.serial),
        CellValue::Text(&record.copyright_owner),
        CellValue::Text(&record.software_name),
        CellValue::Text(&record.first_publication_date),
        CellValue::Text(&record.acquisition_method),
        CellValue::Text(&record.rights_scope),
        CellValue::Text(&record.registration_number),
        CellValue::Text(&record.notes),
    ]
}

/// Make a worksheet title acceptable to spreadsheet applications.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_control() || matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .take(31)
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim().to_string();
    if cleaned.is_empty() {
        DEFAULT_SHEET_NAME.to_string()
    } else {
        cleaned
    }
}

/// Writes records to an `.xlsx` workbook with a styled, frozen header row.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    sheet_name: String,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self {
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new().with_sheet_name(&config.sheet_name)
    }

    pub fn with_sheet_name(mut self, name: &str) -> Self {
        self.sheet_name = sanitize_sheet_name(name);
        self
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Write the workbook to `path`.
    pub fn write(&self, records: &[ExtractedRecord], path: &Path) -> Result<(), ReportError> {
        let file = File::create(path)?;
        let mut writer = self.write_to(records, BufWriter::new(file))?;
        writer.flush()?;
        info!("Wrote {} record(s) to {}", records.len(), path.display());
        Ok(())
    }

    /// Write the workbook to any seekable writer and return it.
    pub fn write_to<W: Write + Seek>(
        &self,
        records: &[ExtractedRecord],
        writer: W,
    ) -> Result<W, ReportError> {
        xlsx::write_workbook(writer, &self.sheet_name, records)
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_layout() {
        let headers: Vec<&str> = COLUMNS.iter().map(|c| c.header).collect();
        assert_eq!(
            headers,
            vec!["序号", "著作权人", "软件名称", "首次发表日期", "权利取得方式", "权利范围", "登记号", "备注"]
        );

        let narrowest = COLUMNS.iter().map(|c| c.width).fold(f64::MAX, f64::min);
        let widest = COLUMNS.iter().map(|c| c.width).fold(0.0, f64::max);
        assert_eq!(narrowest, COLUMNS[0].width);
        assert_eq!(widest, COLUMNS[2].width);
    }

    #[test]
    fn test_row_values_keep_field_text() {
        let record = ExtractedRecord {
            serial: 3,
            software_name: "A&B 管理系统".to_string(),
            registration_number: "2021SR123456".to_string(),
            ..Default::default()
        };
        let row = row_values(&record);
        assert_eq!(row[0], CellValue::Number(3));
        assert_eq!(row[2], CellValue::Text("A&B 管理系统"));
        assert_eq!(row[6], CellValue::Text("2021SR123456"));
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("软件著作权清单"), "软件著作权清单");
        assert_eq!(sanitize_sheet_name("2021/2022 [draft]"), "2021_2022 _draft_");
        assert_eq!(sanitize_sheet_name("''"), DEFAULT_SHEET_NAME);
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).chars().count(), 31);
    }
}

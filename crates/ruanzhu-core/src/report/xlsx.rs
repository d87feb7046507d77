//! Minimal SpreadsheetML writer: one sheet of inline strings.

use std::borrow::Cow;
use std::io::{Seek, Write};

use chrono::{SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ReportError;
use crate::models::ExtractedRecord;

use super::{row_values, Align, CellValue, COLUMNS};

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const COLUMN_LETTERS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];

// cellXfs indices in styles.xml
const STYLE_HEADER: &str = "1";
const STYLE_CENTER: &str = "2";
const STYLE_LEFT: &str = "3";

const HEADER_FONT: &str = "微软雅黑";
const HEADER_FILL: &str = "FF4472C4";
const HEADER_ROW_HEIGHT: &str = "25";

/// One XML part being built.
struct Part {
    name: &'static str,
    writer: Writer<Vec<u8>>,
}

impl Part {
    fn new(name: &'static str) -> Result<Self, ReportError> {
        let mut part = Self {
            name,
            writer: Writer::new(Vec::new()),
        };
        part.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(part)
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), ReportError> {
        self.writer
            .write_event(event)
            .map_err(|e| ReportError::Xml {
                part: self.name,
                reason: e.to_string(),
            })
    }

    fn start(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<(), ReportError> {
        let elem = BytesStart::new(tag).with_attributes(attrs.iter().copied());
        self.event(Event::Start(elem))
    }

    fn empty(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<(), ReportError> {
        let elem = BytesStart::new(tag).with_attributes(attrs.iter().copied());
        self.event(Event::Empty(elem))
    }

    fn end(&mut self, tag: &str) -> Result<(), ReportError> {
        self.event(Event::End(BytesEnd::new(tag)))
    }

    fn text_element(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) -> Result<(), ReportError> {
        self.start(tag, attrs)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(tag)
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Write a complete workbook into `writer`.
pub(super) fn write_workbook<W: Write + Seek>(
    writer: W,
    sheet_name: &str,
    records: &[ExtractedRecord],
) -> Result<W, ReportError> {
    let parts: [(&str, Vec<u8>); 8] = [
        ("[Content_Types].xml", content_types()?),
        ("_rels/.rels", package_rels()?),
        ("docProps/app.xml", app_props()?),
        ("docProps/core.xml", core_props()?),
        ("xl/workbook.xml", workbook(sheet_name)?),
        ("xl/_rels/workbook.xml.rels", workbook_rels()?),
        ("xl/styles.xml", styles()?),
        ("xl/worksheets/sheet1.xml", worksheet(records)?),
    ];

    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in parts {
        zip.start_file(name, options)?;
        zip.write_all(&bytes)?;
    }
    Ok(zip.finish()?)
}

fn content_types() -> Result<Vec<u8>, ReportError> {
    let mut p = Part::new("[Content_Types].xml")?;
    p.start("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    p.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    p.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;

    let overrides = [
        (
            "/xl/workbook.xml",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
        ),
        (
            "/xl/worksheets/sheet1.xml",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
        ),
        (
            "/xl/styles.xml",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml",
        ),
        (
            "/docProps/core.xml",
            "application/vnd.openxmlformats-package.core-properties+xml",
        ),
        (
            "/docProps/app.xml",
            "application/vnd.openxmlformats-officedocument.extended-properties+xml",
        ),
    ];
    for (part_name, content_type) in overrides {
        p.empty("Override", &[("PartName", part_name), ("ContentType", content_type)])?;
    }

    p.end("Types")?;
    Ok(p.finish())
}

fn relationships(
    part: &'static str,
    rels: &[(&str, &str, &str)],
) -> Result<Vec<u8>, ReportError> {
    let mut p = Part::new(part)?;
    p.start("Relationships", &[("xmlns", NS_PKG_REL)])?;
    for &(id, kind, target) in rels {
        p.empty("Relationship", &[("Id", id), ("Type", kind), ("Target", target)])?;
    }
    p.end("Relationships")?;
    Ok(p.finish())
}

fn package_rels() -> Result<Vec<u8>, ReportError> {
    relationships(
        "_rels/.rels",
        &[
            (
                "rId1",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument",
                "xl/workbook.xml",
            ),
            (
                "rId2",
                "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
                "docProps/core.xml",
            ),
            (
                "rId3",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties",
                "docProps/app.xml",
            ),
        ],
    )
}

fn workbook_rels() -> Result<Vec<u8>, ReportError> {
    relationships(
        "xl/_rels/workbook.xml.rels",
        &[
            (
                "rId1",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet",
                "worksheets/sheet1.xml",
            ),
            (
                "rId2",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles",
                "styles.xml",
            ),
        ],
    )
}

fn app_props() -> Result<Vec<u8>, ReportError> {
    let mut p = Part::new("docProps/app.xml")?;
    p.start(
        "Properties",
        &[("xmlns", "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties")],
    )?;
    p.text_element("Application", &[], env!("CARGO_PKG_NAME"))?;
    p.end("Properties")?;
    Ok(p.finish())
}

fn core_props() -> Result<Vec<u8>, ReportError> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut p = Part::new("docProps/core.xml")?;
    p.start(
        "cp:coreProperties",
        &[
            ("xmlns:cp", "http://schemas.openxmlformats.org/package/2006/metadata/core-properties"),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )?;
    p.text_element("dc:creator", &[], env!("CARGO_PKG_NAME"))?;
    p.text_element("dcterms:created", &[("xsi:type", "dcterms:W3CDTF")], &now)?;
    p.text_element("dcterms:modified", &[("xsi:type", "dcterms:W3CDTF")], &now)?;
    p.end("cp:coreProperties")?;
    Ok(p.finish())
}

fn workbook(sheet_name: &str) -> Result<Vec<u8>, ReportError> {
    let mut p = Part::new("xl/workbook.xml")?;
    p.start("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_REL)])?;
    p.start("sheets", &[])?;
    p.empty("sheet", &[("name", sheet_name), ("sheetId", "1"), ("r:id", "rId1")])?;
    p.end("sheets")?;
    p.end("workbook")?;
    Ok(p.finish())
}

fn styles() -> Result<Vec<u8>, ReportError> {
    let mut p = Part::new("xl/styles.xml")?;
    p.start("styleSheet", &[("xmlns", NS_MAIN)])?;

    p.start("fonts", &[("count", "3")])?;
    // 0: default
    p.start("font", &[])?;
    p.empty("sz", &[("val", "11")])?;
    p.empty("name", &[("val", "Calibri")])?;
    p.empty("family", &[("val", "2")])?;
    p.end("font")?;
    // 1: header
    p.start("font", &[])?;
    p.empty("b", &[])?;
    p.empty("sz", &[("val", "11")])?;
    p.empty("color", &[("rgb", "FFFFFFFF")])?;
    p.empty("name", &[("val", HEADER_FONT)])?;
    p.empty("family", &[("val", "2")])?;
    p.end("font")?;
    // 2: data
    p.start("font", &[])?;
    p.empty("sz", &[("val", "10")])?;
    p.empty("name", &[("val", HEADER_FONT)])?;
    p.empty("family", &[("val", "2")])?;
    p.end("font")?;
    p.end("fonts")?;

    p.start("fills", &[("count", "3")])?;
    for pattern in ["none", "gray125"] {
        p.start("fill", &[])?;
        p.empty("patternFill", &[("patternType", pattern)])?;
        p.end("fill")?;
    }
    p.start("fill", &[])?;
    p.start("patternFill", &[("patternType", "solid")])?;
    p.empty("fgColor", &[("rgb", HEADER_FILL)])?;
    p.empty("bgColor", &[("indexed", "64")])?;
    p.end("patternFill")?;
    p.end("fill")?;
    p.end("fills")?;

    p.start("borders", &[("count", "2")])?;
    p.start("border", &[])?;
    for side in ["left", "right", "top", "bottom", "diagonal"] {
        p.empty(side, &[])?;
    }
    p.end("border")?;
    p.start("border", &[])?;
    for side in ["left", "right", "top", "bottom"] {
        p.start(side, &[("style", "thin")])?;
        p.empty("color", &[("auto", "1")])?;
        p.end(side)?;
    }
    p.empty("diagonal", &[])?;
    p.end("border")?;
    p.end("borders")?;

    p.start("cellStyleXfs", &[("count", "1")])?;
    p.empty("xf", &[("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0")])?;
    p.end("cellStyleXfs")?;

    p.start("cellXfs", &[("count", "4")])?;
    p.empty(
        "xf",
        &[("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0"), ("xfId", "0")],
    )?;
    for (font, fill, horizontal) in [("1", "2", "center"), ("2", "0", "center"), ("2", "0", "left")] {
        p.start(
            "xf",
            &[
                ("numFmtId", "0"),
                ("fontId", font),
                ("fillId", fill),
                ("borderId", "1"),
                ("xfId", "0"),
                ("applyFont", "1"),
                ("applyFill", "1"),
                ("applyBorder", "1"),
                ("applyAlignment", "1"),
            ],
        )?;
        p.empty(
            "alignment",
            &[("horizontal", horizontal), ("vertical", "center"), ("wrapText", "1")],
        )?;
        p.end("xf")?;
    }
    p.end("cellXfs")?;

    p.start("cellStyles", &[("count", "1")])?;
    p.empty("cellStyle", &[("name", "Normal"), ("xfId", "0"), ("builtinId", "0")])?;
    p.end("cellStyles")?;

    p.end("styleSheet")?;
    Ok(p.finish())
}

fn worksheet(records: &[ExtractedRecord]) -> Result<Vec<u8>, ReportError> {
    let mut p = Part::new("xl/worksheets/sheet1.xml")?;
    p.start("worksheet", &[("xmlns", NS_MAIN), ("xmlns:r", NS_REL)])?;

    let last_row = records.len() + 1;
    let dimension = format!("A1:H{}", last_row);
    p.empty("dimension", &[("ref", dimension.as_str())])?;

    // Header row stays visible while scrolling
    p.start("sheetViews", &[])?;
    p.start("sheetView", &[("tabSelected", "1"), ("workbookViewId", "0")])?;
    p.empty(
        "pane",
        &[("ySplit", "1"), ("topLeftCell", "A2"), ("activePane", "bottomLeft"), ("state", "frozen")],
    )?;
    p.empty("selection", &[("pane", "bottomLeft"), ("activeCell", "A2"), ("sqref", "A2")])?;
    p.end("sheetView")?;
    p.end("sheetViews")?;

    p.empty("sheetFormatPr", &[("defaultRowHeight", "15")])?;

    p.start("cols", &[])?;
    for (i, column) in COLUMNS.iter().enumerate() {
        let index = (i + 1).to_string();
        let width = column.width.to_string();
        p.empty(
            "col",
            &[("min", index.as_str()), ("max", index.as_str()), ("width", width.as_str()), ("customWidth", "1")],
        )?;
    }
    p.end("cols")?;

    p.start("sheetData", &[])?;

    p.start("row", &[("r", "1"), ("ht", HEADER_ROW_HEIGHT), ("customHeight", "1")])?;
    for (letter, column) in COLUMN_LETTERS.iter().zip(COLUMNS.iter()) {
        inline_string(&mut p, &format!("{}1", letter), STYLE_HEADER, column.header)?;
    }
    p.end("row")?;

    for (i, record) in records.iter().enumerate() {
        let row = (i + 2).to_string();
        p.start("row", &[("r", row.as_str())])?;
        for ((letter, column), value) in COLUMN_LETTERS.iter().zip(COLUMNS.iter()).zip(row_values(record)) {
            let cell = format!("{}{}", letter, row);
            let style = match column.align {
                Align::Center => STYLE_CENTER,
                Align::Left => STYLE_LEFT,
            };
            match value {
                CellValue::Number(n) => {
                    p.start("c", &[("r", cell.as_str()), ("s", style)])?;
                    p.text_element("v", &[], &n.to_string())?;
                    p.end("c")?;
                }
                CellValue::Text("") => p.empty("c", &[("r", cell.as_str()), ("s", style)])?,
                CellValue::Text(text) => inline_string(&mut p, &cell, style, text)?,
            }
        }
        p.end("row")?;
    }

    p.end("sheetData")?;
    p.end("worksheet")?;
    Ok(p.finish())
}

fn inline_string(p: &mut Part, cell: &str, style: &str, text: &str) -> Result<(), ReportError> {
    p.start("c", &[("r", cell), ("s", style), ("t", "inlineStr")])?;
    p.start("is", &[])?;
    p.text_element("t", &[("xml:space", "preserve")], &escape_xstring(text))?;
    p.end("is")?;
    p.end("c")
}

/// Escape characters XML 1.0 cannot carry as `_xHHHH_`. A literal `_xHHHH_`
/// sequence gets its underscore escaped so spreadsheet readers keep it as is.
fn escape_xstring(text: &str) -> Cow<'_, str> {
    let needs_escape = |c: char| {
        matches!(c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}')
    };
    let is_escape_at = |i: usize| {
        let bytes = text.as_bytes();
        bytes.len() >= i + 7
            && bytes[i + 1] == b'x'
            && bytes[i + 2..i + 6].iter().all(u8::is_ascii_hexdigit)
            && bytes[i + 6] == b'_'
    };

    if !text
        .char_indices()
        .any(|(i, c)| needs_escape(c) || (c == '_' && is_escape_at(i)))
    {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    for (i, c) in text.char_indices() {
        if needs_escape(c) || (c == '_' && is_escape_at(i)) {
            out.push_str(&format!("_x{:04X}_", c as u32));
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

//! In-memory XLSX workbook writer.
//!
//! Produces a minimal SpreadsheetML package (inline strings, one bold
//! bordered style for headers and index cells) with the `zip` crate.

use std::fmt::Write as _;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{export_file_name, summary_rows};
use crate::dcf::DcfReport;
use crate::error::Result;

/// MIME type of an `.xlsx` file.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const STYLE_HEADER: u8 = 1;

const CONTENT_TYPES_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="2"><border><left/><right/><top/><bottom/><diagonal/></border><border><left style="thin"><color auto="1"/></left><right style="thin"><color auto="1"/></right><top style="thin"><color auto="1"/></top><bottom style="thin"><color auto="1"/></bottom><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="1" xfId="0" applyFont="1" applyBorder="1" applyAlignment="1"><alignment horizontal="center" vertical="top"/></xf></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

// ============================================================================
// Workbook Model
// ============================================================================

/// Value stored in a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Blank,
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<usize> for CellValue {
    fn from(v: usize) -> Self {
        Self::Number(v as f64)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    /// Bold with thin borders
    pub header: bool,
}

impl Cell {
    pub fn plain(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            header: false,
        }
    }

    pub fn header(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            header: true,
        }
    }
}

/// One worksheet, stored row-major from A1.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Index-labelled table: a header row (empty corner cell, then
    /// `columns`) followed by one bold index cell per row.
    pub fn table<I, V>(name: &str, columns: &[&str], rows: I) -> Self
    where
        I: IntoIterator<Item = (CellValue, Vec<V>)>,
        V: Into<CellValue>,
    {
        let mut sheet = Self::new(name);

        let mut header = vec![Cell::header(CellValue::Blank)];
        header.extend(columns.iter().map(|c| Cell::header(*c)));
        sheet.push_row(header);

        for (index, values) in rows {
            let mut row = vec![Cell::header(index)];
            row.extend(values.into_iter().map(Cell::plain));
            sheet.push_row(row);
        }
        sheet
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );

        for (r, row) in self.rows.iter().enumerate() {
            let row_num = r + 1;
            let _ = write!(xml, r#"<row r="{}">"#, row_num);
            for (c, cell) in row.iter().enumerate() {
                let reference = format!("{}{}", column_name(c), row_num);
                let style = if cell.header {
                    format!(r#" s="{}""#, STYLE_HEADER)
                } else {
                    String::new()
                };

                match &cell.value {
                    CellValue::Number(v) if v.is_finite() => {
                        let _ = write!(xml, r#"<c r="{}"{}><v>{}</v></c>"#, reference, style, v);
                    }
                    CellValue::Text(text) => {
                        let _ = write!(
                            xml,
                            r#"<c r="{}"{} t="inlineStr"><is><t>{}</t></is></c>"#,
                            reference,
                            style,
                            escape_xml(text)
                        );
                    }
                    // Non-finite numbers are written as empty cells
                    CellValue::Number(_) | CellValue::Blank => {
                        let _ = write!(xml, r#"<c r="{}"{}/>"#, reference, style);
                    }
                }
            }
            xml.push_str("</row>");
        }

        xml.push_str("</sheetData></worksheet>");
        xml
    }
}

/// A set of sheets serialized as one `.xlsx` package.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    /// Serialize to `.xlsx` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(self.content_types().as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(ROOT_RELS.as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(self.workbook_xml().as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(self.workbook_rels().as_bytes())?;

        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(STYLES.as_bytes())?;

        for (i, sheet) in self.sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
            zip.write_all(sheet.to_xml().as_bytes())?;
        }

        Ok(zip.finish()?.into_inner())
    }

    fn content_types(&self) -> String {
        let mut xml = String::from(CONTENT_TYPES_HEAD);
        for i in 1..=self.sheets.len() {
            let _ = write!(
                xml,
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i
            );
        }
        xml.push_str("</Types>");
        xml
    }

    fn workbook_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        );
        for (i, sheet) in self.sheets.iter().enumerate() {
            let _ = write!(
                xml,
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(&sheet.name),
                i + 1,
                i + 1
            );
        }
        xml.push_str("</sheets></workbook>");
        xml
    }

    fn workbook_rels(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for i in 1..=self.sheets.len() {
            let _ = write!(
                xml,
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i, i
            );
        }
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
            self.sheets.len() + 1
        );
        xml.push_str("</Relationships>");
        xml
    }
}

/// Zero-based column index to its letter name (0 → A, 26 → AA).
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// Report Export
// ============================================================================

/// Lay out a report as the four-sheet analysis workbook.
pub fn build_workbook(report: &DcfReport) -> Workbook {
    let mut workbook = Workbook::new();

    workbook.add_sheet(Sheet::table(
        "Historical FCF",
        &["Historical FCF"],
        report
            .historical
            .iter()
            .map(|p| (CellValue::from(p.year), vec![p.value])),
    ));

    workbook.add_sheet(Sheet::table(
        "Future FCF",
        &["Future FCF"],
        report
            .projected
            .values()
            .iter()
            .enumerate()
            .map(|(i, v)| (CellValue::from(i), vec![*v])),
    ));

    workbook.add_sheet(Sheet::table(
        "PV of Future FCF",
        &["PV of Future FCF"],
        report
            .present_values
            .values()
            .iter()
            .enumerate()
            .map(|(i, v)| (CellValue::from(i), vec![*v])),
    ));

    workbook.add_sheet(Sheet::table(
        "Summary",
        &["Metric", "Value"],
        summary_rows(report)
            .into_iter()
            .enumerate()
            .map(|(i, row)| (CellValue::from(i), vec![row.metric, row.value])),
    ));

    workbook
}

/// Serialize a report to `.xlsx` bytes.
pub fn export_xlsx(report: &DcfReport) -> Result<Vec<u8>> {
    build_workbook(report).to_bytes()
}

/// Write a report's workbook into `dir`, returning the file path.
pub fn write_xlsx(report: &DcfReport, dir: &Path) -> Result<PathBuf> {
    let bytes = export_xlsx(report)?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(&report.ticker));
    std::fs::write(&path, &bytes)?;

    info!(path = %path.display(), bytes = bytes.len(), "Workbook written");
    Ok(path)
}

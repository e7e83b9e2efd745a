//! Tabular loader
//!
//! Parses the whole upload into memory. CSV cells stay strings; spreadsheet
//! cells keep the type the workbook stored (number, bool, date, text).

use calamine::{Data, Range, Reader, Xls, Xlsx};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::Cursor;

use crate::error::IntakeError;
use crate::headers::normalize_header;
use crate::validator::TabularFormat;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A single cell as read from the source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// Spreadsheet error cell such as `#DIV/0!`
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::DateTime(dt) => write!(f, "{}", dt),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::String(s.clone()),
            Data::Int(i) => CellValue::Int(*i),
            Data::Float(v) => CellValue::Float(*v),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => {
                if dt.is_duration() {
                    CellValue::Float(dt.as_f64())
                } else {
                    dt.as_datetime()
                        .map(CellValue::DateTime)
                        .unwrap_or_else(|| CellValue::Float(dt.as_f64()))
                }
            }
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
            Data::Error(e) => CellValue::Error(e.to_string()),
        }
    }
}

/// Rectangular table: raw column names plus rows of cells in column order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl ParsedTable {
    /// Build a table, padding short rows with [`CellValue::Empty`]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Column names exactly as they appear in the header row
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of the first column whose normalized name is `field`
    pub fn column_index(&self, field: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| normalize_header(c) == field)
    }

    /// Cell at `row` in the column whose normalized name is `field`
    pub fn get(&self, row: usize, field: &str) -> Option<&CellValue> {
        let col = self.column_index(field)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// One row as (raw column name, cell) pairs
    pub fn record(&self, row: usize) -> Option<Vec<(&str, &CellValue)>> {
        self.rows.get(row).map(|cells| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(cells.iter())
                .collect()
        })
    }
}

/// Parses upload bytes into a [`ParsedTable`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularLoader;

impl TabularLoader {
    /// Load `data` as the given format. The first row is the header row.
    pub fn load(&self, data: &[u8], format: TabularFormat) -> Result<ParsedTable, IntakeError> {
        let result = match format {
            TabularFormat::Csv => load_csv(data),
            TabularFormat::Xls => load_first_sheet::<Xls<Cursor<&[u8]>>>(data),
            TabularFormat::Xlsx | TabularFormat::Xlsm => {
                load_first_sheet::<Xlsx<Cursor<&[u8]>>>(data)
            }
        };

        match result {
            Ok(table) => {
                tracing::debug!(
                    format = %format,
                    columns = table.column_count(),
                    rows = table.row_count(),
                    "Loaded tabular file"
                );
                Ok(table)
            }
            Err(detail) => {
                tracing::warn!(format = %format, error = %detail, "Failed to read uploaded file");
                Err(IntakeError::UnreadableFile(detail))
            }
        }
    }

    /// Load by dotted extension; unknown extensions are unreadable
    pub fn load_extension(&self, data: &[u8], extension: &str) -> Result<ParsedTable, IntakeError> {
        let format = TabularFormat::from_extension(extension).ok_or_else(|| {
            IntakeError::UnreadableFile(format!("Unsupported file format '{}'", extension))
        })?;
        self.load(data, format)
    }
}

fn load_csv(data: &[u8]) -> Result<ParsedTable, String> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err("file is empty".to_string());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err("no header row".to_string());
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() > columns.len() {
            return Err(format!(
                "row {} has {} fields, expected {}",
                idx + 2,
                record.len(),
                columns.len()
            ));
        }
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::String(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(ParsedTable::new(columns, rows))
}

fn load_first_sheet<'a, R>(data: &'a [u8]) -> Result<ParsedTable, String>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: Display,
{
    if data.is_empty() {
        return Err("file is empty".to_string());
    }

    let mut workbook = R::new(Cursor::new(data)).map_err(|e| e.to_string())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no sheets".to_string())?
        .map_err(|e| e.to_string())?;

    table_from_range(&range)
}

fn table_from_range(range: &Range<Data>) -> Result<ParsedTable, String> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| "first sheet is empty".to_string())?;

    let columns: Vec<String> = header
        .iter()
        .map(|cell| match cell {
            Data::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();

    let rows = rows
        .map(|row| row.iter().map(CellValue::from).collect())
        .collect();

    Ok(ParsedTable::new(columns, rows))
}

//! Data sources that feed raw tables into a [`Session`](crate::session::Session).
//!
//! A source only has to produce a header row and data rows of [`RawCell`]s
//! in a stable order. Normalization, identity selection and coercion all
//! happen downstream.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, open_workbook_auto};
use encoding_rs::Encoding;
use log::debug;

use crate::{data::RawCell, io_utils};

/// Identity of a data source. Two loads with the same identity are expected
/// to yield the same table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceIdentity {
    pub kind: &'static str,
    pub location: String,
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.location)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

pub trait DataSource {
    fn identity(&self) -> SourceIdentity;
    fn read_table(&self) -> Result<RawTable>;
}

#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
    encoding: &'static Encoding,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, delimiter: Option<u8>, encoding: &'static Encoding) -> Self {
        let path = path.into();
        let delimiter = io_utils::resolve_input_delimiter(&path, delimiter);
        CsvSource {
            path,
            delimiter,
            encoding,
        }
    }
}

impl DataSource for CsvSource {
    fn identity(&self) -> SourceIdentity {
        SourceIdentity {
            kind: "csv",
            location: self.path.display().to_string(),
        }
    }

    fn read_table(&self) -> Result<RawTable> {
        debug!(
            "Reading {:?} with delimiter '{}' and encoding {}",
            self.path,
            io_utils::printable_delimiter(self.delimiter),
            self.encoding.name()
        );
        let mut reader = io_utils::open_csv_reader_from_path(&self.path, self.delimiter)?;
        let headers = io_utils::reader_headers(&mut reader, self.encoding)
            .with_context(|| format!("Reading headers from {:?}", self.path))?;
        let mut rows: Vec<Vec<RawCell>> = Vec::new();
        for (idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {}", idx + 2))?;
            let decoded = io_utils::decode_record(&record, self.encoding)
                .with_context(|| format!("Decoding row {}", idx + 2))?;
            rows.push(decoded.iter().map(|cell| RawCell::from_text(cell)).collect());
        }
        Ok(RawTable { headers, rows })
    }
}

/// Reads one worksheet of a spreadsheet workbook; the first sheet unless a
/// name is given. The first non-empty row is the header row.
#[derive(Debug, Clone)]
pub struct XlsxSource {
    path: PathBuf,
    sheet: Option<String>,
}

impl XlsxSource {
    pub fn new(path: impl Into<PathBuf>, sheet: Option<String>) -> Self {
        XlsxSource {
            path: path.into(),
            sheet,
        }
    }
}

impl DataSource for XlsxSource {
    fn identity(&self) -> SourceIdentity {
        let location = match &self.sheet {
            Some(sheet) => format!("{}#{sheet}", self.path.display()),
            None => self.path.display().to_string(),
        };
        SourceIdentity {
            kind: "workbook",
            location,
        }
    }

    fn read_table(&self) -> Result<RawTable> {
        let mut workbook = open_workbook_auto(&self.path)
            .with_context(|| format!("Opening workbook {:?}", self.path))?;
        let sheet = match &self.sheet {
            Some(name) => name.clone(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("Workbook {:?} has no worksheets", self.path))?,
        };
        debug!("Reading worksheet '{sheet}' from {:?}", self.path);
        let range = workbook
            .worksheet_range(&sheet)
            .with_context(|| format!("Reading worksheet '{sheet}' from {:?}", self.path))?;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(convert_cell).collect::<Vec<_>>())
            .skip_while(|row| row.iter().all(RawCell::is_blank));
        let headers = rows
            .next()
            .map(|header| header.iter().map(RawCell::as_text).collect())
            .unwrap_or_default();
        Ok(RawTable {
            headers,
            rows: rows.collect(),
        })
    }
}

fn convert_cell(data: &Data) -> RawCell {
    match data {
        Data::Empty => RawCell::Blank,
        Data::String(s) => RawCell::from_text(s),
        Data::Float(f) => RawCell::Number(*f),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::Error(e) => RawCell::Text(e.to_string()),
        Data::DateTime(dt) => RawCell::Number(dt.as_f64()),
        Data::DateTimeIso(s) => RawCell::Text(s.clone()),
        Data::DurationIso(s) => RawCell::Text(s.clone()),
    }
}

/// An already materialized table, for embedding callers and tests.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    table: RawTable,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, table: RawTable) -> Self {
        MemorySource {
            name: name.into(),
            table,
        }
    }

    /// Builds a table where every cell is delimited text.
    pub fn from_rows(name: impl Into<String>, headers: &[&str], rows: &[&[&str]]) -> Self {
        let table = RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| RawCell::from_text(cell)).collect())
                .collect(),
        };
        MemorySource::new(name, table)
    }
}

impl DataSource for MemorySource {
    fn identity(&self) -> SourceIdentity {
        SourceIdentity {
            kind: "memory",
            location: self.name.clone(),
        }
    }

    fn read_table(&self) -> Result<RawTable> {
        Ok(self.table.clone())
    }
}

/// Picks the reader for a path by extension.
pub fn open_path(
    path: &Path,
    sheet: Option<String>,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Box<dyn DataSource> {
    if io_utils::is_workbook(path) {
        Box::new(XlsxSource::new(path, sheet))
    } else {
        Box::new(CsvSource::new(path, delimiter, encoding))
    }
}

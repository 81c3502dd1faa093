//! Loading movement transactions from spreadsheet and CSV exports.

use std::path::{Path, PathBuf};

use audit_core::{AuditConfig, TransactionRecord};
use calamine::{open_workbook_auto, Data, Reader};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input file not found: {}", .0.display())] NotFound(PathBuf),
    #[error("input is missing required columns: {}", .0.join(", "))] MissingColumns(Vec<String>),
    #[error("row {row}: {reason}")] Malformed { row: usize, reason: String },
    #[error("spreadsheet error: {0}")] Spreadsheet(#[from] calamine::Error),
    #[error("csv error: {0}")] Csv(#[from] csv::Error),
    #[error("workbook has no worksheets")] EmptyWorkbook,
    #[error("worksheet '{0}' not found")] SheetMissing(String),
}

pub trait TransactionSource {
    fn load(&self) -> Result<Vec<TransactionRecord>, IngestError>;
}

/// Headers naming the repair number and movement code columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub repair: String,
    pub movement: String,
}

impl From<&AuditConfig> for ColumnSpec {
    fn from(cfg: &AuditConfig) -> Self { Self { repair: cfg.repair_column.clone(), movement: cfg.movement_column.clone() } }
}

/// xlsx / xlsm / xls / ods workbook; reads `sheet` or the first worksheet.
#[derive(Debug, Clone)]
pub struct SpreadsheetSource {
    pub path: PathBuf,
    pub sheet: Option<String>,
    pub columns: ColumnSpec,
}

#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub columns: ColumnSpec,
}

/// Picks a source by file extension: `.csv` is read as CSV, anything else as a workbook.
pub fn source_for(path: &Path, cfg: &AuditConfig) -> Box<dyn TransactionSource> {
    let is_csv = path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("csv")).unwrap_or(false);
    if is_csv {
        Box::new(CsvSource { path: path.to_path_buf(), columns: cfg.into() })
    } else {
        Box::new(SpreadsheetSource { path: path.to_path_buf(), sheet: cfg.sheet.clone(), columns: cfg.into() })
    }
}

pub fn load_transactions(path: &Path, cfg: &AuditConfig) -> Result<Vec<TransactionRecord>, IngestError> {
    source_for(path, cfg).load()
}

#[derive(Debug, Clone, PartialEq)]
enum Cell { Empty, Int(i64), Number(f64), Text(String), Other(String) }

impl From<&Data> for Cell {
    fn from(d: &Data) -> Self {
        match d {
            Data::Empty => Cell::Empty,
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) => Cell::Text(s.clone()),
            other => Cell::Other(other.to_string()),
        }
    }
}

impl Cell {
    fn text(s: &str) -> Self { if s.trim().is_empty() { Cell::Empty } else { Cell::Text(s.to_string()) } }

    fn is_empty(&self) -> bool { matches!(self, Cell::Empty) || matches!(self, Cell::Text(s) if s.trim().is_empty()) }

    fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Int(i) => i.to_string(),
            Cell::Number(f) => format_number(*f),
            Cell::Text(s) | Cell::Other(s) => s.trim().to_string(),
        }
    }
}

fn format_number(f: f64) -> String { integral(f).map(|i| i.to_string()).unwrap_or_else(|| f.to_string()) }

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndex { repair: usize, movement: usize }

fn locate_columns(header: &[String], spec: &ColumnSpec) -> Result<ColumnIndex, IngestError> {
    let find = |name: &str| header.iter().position(|h| h.trim() == name);
    match (find(&spec.repair), find(&spec.movement)) {
        (Some(repair), Some(movement)) => Ok(ColumnIndex { repair, movement }),
        (repair, movement) => {
            let mut missing = Vec::new();
            if repair.is_none() { missing.push(spec.repair.clone()); }
            if movement.is_none() { missing.push(spec.movement.clone()); }
            Err(IngestError::MissingColumns(missing))
        }
    }
}

/// Builds a record from one row's two cells. Rows blank in both cells are skipped.
fn to_record(row: usize, repair: &Cell, code: &Cell, spec: &ColumnSpec) -> Result<Option<TransactionRecord>, IngestError> {
    let malformed = |reason: String| IngestError::Malformed { row, reason };
    match (repair.is_empty(), code.is_empty()) {
        (true, true) => return Ok(None),
        (true, false) => return Err(malformed(format!("missing {}", spec.repair))),
        (false, true) => return Err(malformed(format!("missing {}", spec.movement))),
        _ => {}
    }
    let movement_code = match code {
        Cell::Int(i) => *i,
        Cell::Number(f) => integral(*f).ok_or_else(|| malformed(format!("{} {f} is not an integer", spec.movement)))?,
        Cell::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
                .ok_or_else(|| malformed(format!("{} '{s}' is not an integer", spec.movement)))?
        }
        Cell::Other(s) => return Err(malformed(format!("{} '{s}' is not an integer", spec.movement))),
        Cell::Empty => return Err(malformed(format!("missing {}", spec.movement))),
    };
    Ok(Some(TransactionRecord { repair_number: repair.render(), movement_code }))
}

impl TransactionSource for SpreadsheetSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Vec<TransactionRecord>, IngestError> {
        if !self.path.exists() { return Err(IngestError::NotFound(self.path.clone())); }
        let mut workbook = open_workbook_auto(&self.path)?;
        let range = match &self.sheet {
            Some(name) => {
                if !workbook.sheet_names().iter().any(|n| n == name) { return Err(IngestError::SheetMissing(name.clone())); }
                workbook.worksheet_range(name)?
            }
            None => workbook.worksheet_range_at(0).ok_or(IngestError::EmptyWorkbook)??,
        };
        // 1-based sheet row of the header; ranges need not start at A1.
        let first_row = range.start().map(|(r, _)| r as usize + 1).unwrap_or(1);
        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .map(|r| r.iter().map(|c| Cell::from(c).render()).collect())
            .unwrap_or_default();
        let cols = locate_columns(&header, &self.columns)?;

        let mut out = Vec::new();
        let mut skipped = 0usize;
        for (i, row) in rows.enumerate() {
            let cell = |idx: usize| row.get(idx).map(Cell::from).unwrap_or(Cell::Empty);
            match to_record(first_row + i + 1, &cell(cols.repair), &cell(cols.movement), &self.columns)? {
                Some(rec) => out.push(rec),
                None => skipped += 1,
            }
        }
        if skipped > 0 { debug!(skipped, "blank_rows_skipped"); }
        info!(rows = out.len(), "spreadsheet_loaded");
        Ok(out)
    }
}

impl TransactionSource for CsvSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Vec<TransactionRecord>, IngestError> {
        if !self.path.exists() { return Err(IngestError::NotFound(self.path.clone())); }
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(&self.path)?;
        let header: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let cols = locate_columns(&header, &self.columns)?;

        let mut out = Vec::new();
        for (i, rec) in reader.records().enumerate() {
            let rec = rec?;
            let row = rec.position().map(|p| p.line() as usize).unwrap_or(i + 2);
            let cell = |idx: usize| rec.get(idx).map(Cell::text).unwrap_or(Cell::Empty);
            if let Some(r) = to_record(row, &cell(cols.repair), &cell(cols.movement), &self.columns)? { out.push(r); }
        }
        info!(rows = out.len(), "csv_loaded");
        Ok(out)
    }
}

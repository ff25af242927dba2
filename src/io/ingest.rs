//! CSV ingest and column selection.
//!
//! Loading is split in two steps so a caller can inspect the header before
//! choosing columns:
//!
//! 1. [`DataSource::load`] reads a file into [`TabularData`] (header + raw
//!    string rows, no interpretation)
//! 2. [`TabularData::select`] picks the time/PV/OUT/SP columns and builds a
//!    validated [`Trace`]
//!
//! Every failure here is a [`PidError::DataLoad`] and names the file, column
//! or line involved.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::{ColumnSelection, Trace};
use crate::error::{PidError, PidResult};

/// Anything that can turn a path into tabular data.
pub trait DataSource {
    fn load(&self, path: &Path) -> PidResult<TabularData>;
}

/// Comma-separated text with a header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSource;

/// Raw rows of a loaded table.
#[derive(Debug, Clone)]
pub struct TabularData {
    pub source: PathBuf,
    pub headers: Vec<String>,
    /// `(line number, cells)`; line numbers are 1-based and count the header.
    pub rows: Vec<(usize, Vec<String>)>,
}

/// A trace selected from tabular data.
#[derive(Debug, Clone)]
pub struct IngestedTrace {
    pub trace: Trace,
    pub columns: ColumnSelection,
    pub rows_read: usize,
}

impl DataSource for CsvSource {
    fn load(&self, path: &Path) -> PidResult<TabularData> {
        check_extension(path)?;

        let file = File::open(path)
            .map_err(|e| PidError::data_load(format!("Failed to open CSV '{}': {e}", path.display())))?;
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| PidError::data_load(format!("Failed to read CSV headers: {e}")))?
            .iter()
            .map(normalize_header_name)
            .collect();

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            // +2: records start after the header and lines are 1-based.
            let line = idx + 2;
            let record: StringRecord =
                result.map_err(|e| PidError::data_load(format!("CSV parse error on line {line}: {e}")))?;
            rows.push((line, record.iter().map(str::to_string).collect()));
        }

        log::info!("loaded {} rows from {}", rows.len(), path.display());
        Ok(TabularData {
            source: path.to_path_buf(),
            headers,
            rows,
        })
    }
}

impl TabularData {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Build a trace from the named columns. Names match case-sensitively.
    pub fn select(&self, columns: &ColumnSelection) -> PidResult<IngestedTrace> {
        let wanted = [
            columns.time.as_str(),
            columns.sp.as_str(),
            columns.pv.as_str(),
            columns.out.as_str(),
        ];
        let missing: Vec<&str> = wanted
            .iter()
            .copied()
            .filter(|name| self.column_index(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(PidError::data_load(format!(
                "Missing required column(s) in '{}': {}. Available: {}",
                self.source.display(),
                missing.join(", "),
                self.headers.join(", ")
            )));
        }
        let idx: Vec<usize> = wanted.iter().filter_map(|name| self.column_index(name)).collect();

        let mut channels: [Vec<f64>; 4] = Default::default();
        for (line, cells) in &self.rows {
            for (channel, (&col, name)) in channels.iter_mut().zip(idx.iter().zip(wanted)) {
                channel.push(parse_cell(cells, col, name, *line)?);
            }
        }
        if self.rows.is_empty() {
            return Err(PidError::data_load(format!("'{}' has no data rows.", self.source.display())));
        }

        let [time, sp, pv, out] = channels;
        let trace = Trace::new(time, sp, pv, out).map_err(|e| match e {
            PidError::Configuration(msg) => {
                PidError::data_load(format!("Invalid trace in '{}': {msg}", self.source.display()))
            }
            other => other,
        })?;

        Ok(IngestedTrace {
            trace,
            columns: columns.clone(),
            rows_read: self.rows.len(),
        })
    }
}

fn check_extension(path: &Path) -> PidResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => Ok(()),
        "xlsx" | "xls" => Err(PidError::data_load(format!(
            "Excel workbooks are not supported ('{}'); export the sheet to CSV first.",
            path.display()
        ))),
        _ => Err(PidError::data_load(format!(
            "Unsupported file type '{}'; expected a .csv file.",
            path.display()
        ))),
    }
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn parse_cell(cells: &[String], col: usize, name: &str, line: usize) -> PidResult<f64> {
    let raw = cells
        .get(col)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PidError::data_load(format!("Line {line}: missing value for `{name}`")))?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PidError::data_load(format!("Line {line}: `{name}` value '{raw}' is not a finite number")))
}

/// Load `path` with [`CsvSource`] and select `columns`.
pub fn load_trace(path: &Path, columns: &ColumnSelection) -> PidResult<IngestedTrace> {
    CsvSource.load(path)?.select(columns)
}

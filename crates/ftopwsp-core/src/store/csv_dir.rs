//! CSV-backed table directory.
//!
//! Layout of one file:
//!
//! ```text
//!   time,basin_1,basin_2      <- header: metadata label + column labels
//!   2006-01,0.41,0.38         <- raw inputs carry a leading metadata column
//!   2006-02,,0.52             <- empty cell = missing
//! ```
//!
//! Derived artifacts are written without the metadata column.

use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};

use super::TableStore;
use crate::error::{FtopwspError, Result};
use crate::table::Table;

#[derive(Debug, Clone)]
pub struct CsvDirectory {
    root: PathBuf,
    extension: String,
    /// Drop the first column on read.
    metadata_column: bool,
}

impl CsvDirectory {
    /// Store over raw simulation tables (leading metadata column dropped).
    pub fn raw_inputs(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.to_string(),
            metadata_column: true,
        }
    }

    /// Store over pipeline-written artifacts (no metadata column).
    pub fn derived(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.to_string(),
            metadata_column: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}.{}", self.extension))
    }

    fn unreadable(&self, path: &Path, reason: impl Into<String>) -> FtopwspError {
        FtopwspError::UnreadableFormat {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl TableStore for CsvDirectory {
    fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(FtopwspError::NotFound(self.root.display().to_string()));
        }
        let mut stems = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || ext != Some(self.extension.as_str()) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_string());
            }
        }
        stems.sort();
        Ok(stems)
    }

    fn read(&self, stem: &str) -> Result<Table> {
        let path = self.path_for(stem);
        if !path.is_file() {
            return Err(FtopwspError::NotFound(path.display().to_string()));
        }
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .map_err(|e| self.unreadable(&path, format!("CSV open error: {e}")))?;

        let skip = usize::from(self.metadata_column);
        let headers = rdr
            .headers()
            .map_err(|e| self.unreadable(&path, format!("CSV header error: {e}")))?;
        if headers.len() < skip {
            return Err(self.unreadable(&path, "header has no metadata column"));
        }
        let columns: Vec<String> = headers.iter().skip(skip).map(str::to_string).collect();

        let mut data = Vec::new();
        let mut rows = 0usize;
        for (r, rec) in rdr.records().enumerate() {
            let rec = rec.map_err(|e| self.unreadable(&path, format!("CSV parse error: {e}")))?;
            for (c, field) in rec.iter().skip(skip).enumerate() {
                data.push(parse_cell(field).ok_or_else(|| {
                    self.unreadable(&path, format!("non-numeric or infinite cell {field:?} at row {r}, column {c}"))
                })?);
            }
            rows += 1;
        }
        Table::new(rows, columns.len(), data)?.with_columns(columns)
    }

    fn write(&self, stem: &str, table: &Table) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(stem);
        let mut wtr = WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| self.unreadable(&path, format!("CSV create error: {e}")))?;
        let write_err = |e: csv::Error| self.unreadable(&path, format!("CSV write error: {e}"));

        wtr.write_record(table.columns()).map_err(write_err)?;
        for r in 0..table.rows() {
            let fields: Vec<String> = table
                .row(r)
                .iter()
                .map(|v| if v.is_nan() { String::new() } else { v.to_string() })
                .collect();
            wtr.write_record(&fields).map_err(write_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Blank and `NaN` cells are missing; anything else must parse as a finite
/// `f64`.
fn parse_cell(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() {
        return Some(f64::NAN);
    }
    field.parse::<f64>().ok().filter(|v| !v.is_infinite())
}

use serde::{Deserialize, Serialize};

use crate::error::{FtopwspError, Result};

/// A 2D numeric grid, row-major. Rows are spatial/temporal samples, columns
/// are sub-units (e.g. sub-basins). Missing cells are stored as NaN.
///
/// Tables are immutable once built: every transform returns a new table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
    /// Column labels carried through to written artifacts. Never used in
    /// arithmetic.
    columns: Vec<String>,
}

impl Table {
    /// Build a table from row-major data. Column labels default to `0..cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(FtopwspError::ShapeMismatch {
                context: "table construction".into(),
                expected: (rows, cols),
                found: (data.len() / cols.max(1), cols),
            });
        }
        Ok(Self {
            data,
            rows,
            cols,
            columns: default_columns(cols),
        })
    }

    /// Build a table from nested rows; ragged input is a shape mismatch.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(FtopwspError::ShapeMismatch {
                    context: "ragged rows".into(),
                    expected: (n_rows, n_cols),
                    found: (n_rows, row.len()),
                });
            }
            data.extend(row);
        }
        Self::new(n_rows, n_cols, data)
    }

    /// A table with every cell set to `fill`.
    pub fn filled(rows: usize, cols: usize, fill: f64) -> Self {
        Self {
            data: vec![fill; rows * cols],
            rows,
            cols,
            columns: default_columns(cols),
        }
    }

    /// Replace the column labels. The label count must match `cols`.
    pub fn with_columns(mut self, columns: Vec<String>) -> Result<Self> {
        if columns.len() != self.cols {
            return Err(FtopwspError::ShapeMismatch {
                context: "column labels".into(),
                expected: self.shape(),
                found: (self.rows, columns.len()),
            });
        }
        self.columns = columns;
        Ok(self)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_nan()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row-major cell values, NaN where missing.
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn missing_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Smallest present cell, or `None` when every cell is missing.
    pub fn min_value(&self) -> Option<f64> {
        self.present().fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.min(v))))
    }

    /// Largest present cell, or `None` when every cell is missing.
    pub fn max_value(&self) -> Option<f64> {
        self.present().fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
    }

    /// Apply `f` cell-wise. Missing cells stay missing.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Table {
        Table {
            data: self
                .data
                .iter()
                .map(|&v| if v.is_nan() { v } else { f(v) })
                .collect(),
            rows: self.rows,
            cols: self.cols,
            columns: self.columns.clone(),
        }
    }

    /// Error unless `other` has the same `(rows, cols)`.
    pub fn ensure_same_shape(&self, other: &Table, context: &str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(FtopwspError::ShapeMismatch {
                context: context.to_string(),
                expected: self.shape(),
                found: other.shape(),
            });
        }
        Ok(())
    }

    /// Same shape and labels as `self`, new cell values.
    pub(crate) fn with_data(&self, data: Vec<f64>) -> Table {
        debug_assert_eq!(data.len(), self.data.len());
        Table {
            data,
            rows: self.rows,
            cols: self.cols,
            columns: self.columns.clone(),
        }
    }

    fn present(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied().filter(|v| !v.is_nan())
    }
}

fn default_columns(cols: usize) -> Vec<String> {
    (0..cols).map(|c| c.to_string()).collect()
}

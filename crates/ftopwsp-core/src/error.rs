//! Error taxonomy shared by every pipeline stage.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FtopwspError>;

#[derive(Debug, Error)]
pub enum FtopwspError {
    /// Raw table spans zero range (or has no present cells), so it cannot be
    /// rescaled.
    #[error("degenerate range in {key}: every present cell equals {value}")]
    DegenerateRange { key: String, value: f64 },

    /// `max - min` of a raw table does not fit in an `f64`.
    #[error("unbounded range in {key}: [{min}, {max}] overflows")]
    UnboundedRange { key: String, min: f64, max: f64 },

    #[error("ensemble group {group} has {found} member(s), need at least {required}")]
    InsufficientEnsemble {
        group: String,
        found: usize,
        required: usize,
    },

    #[error("shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("negative radicand {value} at ({row}, {col}) in group {group}")]
    NegativeRadicand {
        group: String,
        row: usize,
        col: usize,
        value: f64,
    },

    /// `sumMax + sumMin == 0` at the listed `(row, col)` cells.
    #[error("index undefined for scenario {scenario} at {} cell(s), first at {:?}", .cells.len(), .cells.first())]
    DegenerateDenominator {
        scenario: String,
        cells: Vec<(usize, usize)>,
    },

    #[error("table not found: {0}")]
    NotFound(String),

    #[error("unreadable table {path}: {reason}")]
    UnreadableFormat { path: PathBuf, reason: String },

    #[error("malformed artifact name {name:?}: {reason}")]
    MalformedName { name: String, reason: String },

    #[error("nothing to combine for {0}")]
    EmptyInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FtopwspError {
    /// Short machine-friendly label used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            FtopwspError::DegenerateRange { .. } => "degenerate_range",
            FtopwspError::UnboundedRange { .. } => "unbounded_range",
            FtopwspError::InsufficientEnsemble { .. } => "insufficient_ensemble",
            FtopwspError::ShapeMismatch { .. } => "shape_mismatch",
            FtopwspError::NegativeRadicand { .. } => "negative_radicand",
            FtopwspError::DegenerateDenominator { .. } => "degenerate_denominator",
            FtopwspError::NotFound(_) => "not_found",
            FtopwspError::UnreadableFormat { .. } => "unreadable_format",
            FtopwspError::MalformedName { .. } => "malformed_name",
            FtopwspError::EmptyInput(_) => "empty_input",
            FtopwspError::Io(_) => "io",
        }
    }
}

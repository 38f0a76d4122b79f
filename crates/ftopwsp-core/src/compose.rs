//! Final index composition: `sumMax / (sumMax + sumMin)` over every tracked
//! variable's aggregates, plus the cross-model mean of family indices.

use crate::config::DenominatorPolicy;
use crate::ensemble::cell_mean;
use crate::error::{FtopwspError, Result};
use crate::table::Table;

/// Composed index for one scenario of one model family.
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub table: Table,
    /// `(row, col)` cells whose denominator was zero. Empty unless the
    /// policy is `MarkMissing`.
    pub degenerate_cells: Vec<(usize, usize)>,
}

/// Compose the index for `scenario` from aggregated max- and min-distance
/// tables. Missing aggregate cells count as 0.
pub fn compose(
    scenario: &str,
    max_tables: &[&Table],
    min_tables: &[&Table],
    policy: DenominatorPolicy,
) -> Result<IndexOutcome> {
    let context = format!("{scenario} index composition");
    let sum_max = cell_sum(max_tables, &context)?;
    let sum_min = cell_sum(min_tables, &context)?;
    index_from_sums(scenario, &sum_max, &sum_min, policy)
}

/// `sum_max / (sum_max + sum_min)`, cell-wise.
pub fn index_from_sums(
    scenario: &str,
    sum_max: &Table,
    sum_min: &Table,
    policy: DenominatorPolicy,
) -> Result<IndexOutcome> {
    sum_max.ensure_same_shape(sum_min, &format!("{scenario} index composition"))?;
    let cols = sum_max.cols();
    let mut degenerate_cells = Vec::new();
    let data = sum_max
        .values()
        .iter()
        .zip(sum_min.values())
        .enumerate()
        .map(|(i, (&hi, &lo))| {
            let denom = hi + lo;
            if denom == 0.0 {
                degenerate_cells.push((i / cols, i % cols));
                f64::NAN
            } else {
                hi / denom
            }
        })
        .collect();

    if !degenerate_cells.is_empty() && policy == DenominatorPolicy::Fail {
        return Err(FtopwspError::DegenerateDenominator {
            scenario: scenario.to_string(),
            cells: degenerate_cells,
        });
    }
    Ok(IndexOutcome {
        table: sum_max.with_data(data),
        degenerate_cells,
    })
}

/// Cell-wise sum with missing cells filled by 0. All tables must share a
/// shape.
pub fn cell_sum(tables: &[&Table], context: &str) -> Result<Table> {
    let first = *tables
        .first()
        .ok_or_else(|| FtopwspError::EmptyInput(context.to_string()))?;
    let mut acc = vec![0.0; first.values().len()];
    for t in tables {
        first.ensure_same_shape(t, context)?;
        for (a, &v) in acc.iter_mut().zip(t.values()) {
            if !v.is_nan() {
                *a += v;
            }
        }
    }
    Ok(first.with_data(acc))
}

/// Mean of several model families' indices for one scenario.
///
/// A cell left missing by any family (a reported degenerate cell) stays
/// missing in the mean.
pub fn cross_model_mean(scenario: &str, indices: &[&Table]) -> Result<Table> {
    let context = format!("{scenario} cross-model mean");
    let mean = cell_mean(indices, &context)?;
    let data = mean
        .values()
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if indices.iter().any(|t| t.values()[i].is_nan()) {
                f64::NAN
            } else {
                v
            }
        })
        .collect();
    Ok(mean.with_data(data))
}

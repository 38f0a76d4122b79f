//! Forcing-model ensemble aggregation: cell-wise mean of the members'
//! distance tables, then cell-wise square root.

use crate::error::{FtopwspError, Result};
use crate::identity::GroupKey;
use crate::table::Table;

/// Distance tables sharing (scenario, variable, variant), one per forcing
/// model.
#[derive(Debug, Clone)]
pub struct EnsembleGroup {
    pub key: GroupKey,
    pub members: Vec<EnsembleMember>,
}

#[derive(Debug, Clone)]
pub struct EnsembleMember {
    pub forcing: String,
    pub table: Table,
}

impl EnsembleGroup {
    pub fn new(key: GroupKey) -> Self {
        Self {
            key,
            members: Vec::new(),
        }
    }

    pub fn push(&mut self, forcing: &str, table: Table) {
        self.members.push(EnsembleMember {
            forcing: forcing.to_string(),
            table,
        });
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Forcing models in the group, sorted.
    pub fn forcings(&self) -> Vec<String> {
        let mut f: Vec<String> = self.members.iter().map(|m| m.forcing.clone()).collect();
        f.sort();
        f
    }
}

/// Aggregate a group: `sqrt(mean(members))`, cell-wise.
///
/// Missing member cells count as 0 before averaging.
pub fn aggregate(group: &EnsembleGroup, min_ensemble_size: usize) -> Result<Table> {
    let key = group.key.to_string();
    if group.len() < min_ensemble_size {
        return Err(FtopwspError::InsufficientEnsemble {
            group: key,
            found: group.len(),
            required: min_ensemble_size,
        });
    }
    let tables: Vec<&Table> = group.members.iter().map(|m| &m.table).collect();
    let mean = cell_mean(&tables, &key)?;
    cell_sqrt(&mean, &key)
}

/// Cell-wise arithmetic mean with missing cells filled by 0.
///
/// Each cell's values are summed in sorted order, so the result is
/// bit-identical for any ordering of `tables`.
pub fn cell_mean(tables: &[&Table], context: &str) -> Result<Table> {
    let first = *tables
        .first()
        .ok_or_else(|| FtopwspError::EmptyInput(context.to_string()))?;
    for t in &tables[1..] {
        first.ensure_same_shape(t, context)?;
    }

    let n = tables.len() as f64;
    let mut cell = Vec::with_capacity(tables.len());
    let data = (0..first.values().len())
        .map(|i| {
            cell.clear();
            cell.extend(tables.iter().map(|t| {
                let v = t.values()[i];
                if v.is_nan() { 0.0 } else { v }
            }));
            cell.sort_by(f64::total_cmp);
            cell.iter().sum::<f64>() / n
        })
        .collect();
    Ok(first.with_data(data))
}

/// Cell-wise square root. A negative cell is a `NegativeRadicand`.
pub fn cell_sqrt(mean: &Table, group: &str) -> Result<Table> {
    let cols = mean.cols();
    if let Some((i, &v)) = mean.values().iter().enumerate().find(|(_, v)| **v < 0.0) {
        return Err(FtopwspError::NegativeRadicand {
            group: group.to_string(),
            row: i / cols,
            col: i % cols,
            value: v,
        });
    }
    Ok(mean.map(f64::sqrt))
}

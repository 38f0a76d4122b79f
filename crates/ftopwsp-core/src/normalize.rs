//! Rescales one raw simulation table onto `[0, factor]` and derives its two
//! fuzzy-distance tables.

use log::debug;

use crate::error::{FtopwspError, Result};
use crate::identity::{VariableIdentity, Variant};
use crate::table::Table;

/// Everything the normalizer produces for one (scenario, variable, forcing)
/// unit.
#[derive(Debug, Clone)]
pub struct NormalizedUnit {
    pub identity: VariableIdentity,
    pub factor: f64,
    /// Global extremes of the raw table, over present cells.
    pub raw_min: f64,
    pub raw_max: f64,
    pub normalized: Table,
    /// `(normalized - normMax)^2`
    pub distance_max: Table,
    /// `(normalized - normMin)^2`
    pub distance_min: Table,
}

impl NormalizedUnit {
    pub fn distance(&self, variant: Variant) -> &Table {
        match variant {
            Variant::Max => &self.distance_max,
            Variant::Min => &self.distance_min,
        }
    }
}

/// Normalize `raw` using the factor of `identity`'s variable.
pub fn normalize(identity: &VariableIdentity, raw: &Table) -> Result<NormalizedUnit> {
    let factor = identity.factor();
    let key = identity.stem();
    let (raw_min, raw_max) = global_range(raw, &key)?;
    debug!("{key}: raw range [{raw_min}, {raw_max}], factor {factor}");

    let normalized = rescale(raw, raw_min, raw_max, factor);

    // Anchors are read back from the data rather than assumed to be 0 and
    // `factor`.
    let (norm_min, norm_max) = global_range(&normalized, &key)?;
    let distance_max = squared_distance(&normalized, norm_max);
    let distance_min = squared_distance(&normalized, norm_min);

    Ok(NormalizedUnit {
        identity: identity.clone(),
        factor,
        raw_min,
        raw_max,
        normalized,
        distance_max,
        distance_min,
    })
}

/// Global `(min, max)` over present cells. Zero span or an all-missing
/// table is a `DegenerateRange`; a span that overflows is an
/// `UnboundedRange`.
pub fn global_range(table: &Table, key: &str) -> Result<(f64, f64)> {
    match (table.min_value(), table.max_value()) {
        (Some(min), Some(max)) if max > min && (max - min).is_finite() => Ok((min, max)),
        (Some(min), Some(max)) if max > min => Err(FtopwspError::UnboundedRange {
            key: key.to_string(),
            min,
            max,
        }),
        (Some(min), _) => Err(FtopwspError::DegenerateRange {
            key: key.to_string(),
            value: min,
        }),
        _ => Err(FtopwspError::DegenerateRange {
            key: key.to_string(),
            value: f64::NAN,
        }),
    }
}

/// `(raw - min) / (max - min) * factor`, cell-wise.
pub fn rescale(raw: &Table, min: f64, max: f64, factor: f64) -> Table {
    let span = max - min;
    raw.map(|v| (v - min) / span * factor)
}

/// `(value - anchor)^2`, cell-wise.
pub fn squared_distance(normalized: &Table, anchor: f64) -> Table {
    normalized.map(|v| (v - anchor).powi(2))
}

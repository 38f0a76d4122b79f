//! Typed identities parsed once from artifact names.
//!
//! Raw inputs are named `{scenario}_{forcing}_{variable}`. Derived artifacts
//! append fixed suffixes so their origin is always recoverable:
//!
//! ```text
//!   rcp26_gfdl_qsb                              raw input
//!   rcp26_gfdl_qsb_minus_max_square             distance (max anchor)
//!   rcp26_gfdl_qsb_minus_min_square             distance (min anchor)
//!   rcp26_qsb_minus_max_square_root_merge       ensemble aggregate
//!   rcp26_FTOPWSP                               index
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FtopwspError, Result};

const TOKEN_SEP: char = '_';
const MAX_SUFFIX: &str = "_minus_max_square";
const MIN_SUFFIX: &str = "_minus_min_square";
const MERGE_SUFFIX: &str = "_root_merge";
const INDEX_SUFFIX: &str = "_FTOPWSP";

// ── Variables ─────────────────────────────────────────────────────────────────

/// Hydrological variables with a fixed normalization factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variable {
    /// Domestic water withdrawal.
    Adomww,
    /// Industrial water withdrawal.
    Ainww,
    /// Irrigation water withdrawal.
    Airrww,
    Evap,
    /// Groundwater recharge.
    Qg,
    /// Total runoff.
    Qr,
    /// Surface runoff.
    Qs,
    /// Subsurface runoff.
    Qsb,
    Soilmoist,
    /// Snow water equivalent.
    Swe,
}

impl Variable {
    pub const ALL: [Variable; 10] = [
        Variable::Adomww,
        Variable::Ainww,
        Variable::Airrww,
        Variable::Evap,
        Variable::Qg,
        Variable::Qr,
        Variable::Qs,
        Variable::Qsb,
        Variable::Soilmoist,
        Variable::Swe,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Variable::Adomww => "adomww",
            Variable::Ainww => "ainww",
            Variable::Airrww => "airrww",
            Variable::Evap => "evap",
            Variable::Qg => "qg",
            Variable::Qr => "qr",
            Variable::Qs => "qs",
            Variable::Qsb => "qsb",
            Variable::Soilmoist => "soilmoist",
            Variable::Swe => "swe",
        }
    }

    /// Upper bound of the normalized scale for this variable.
    pub fn factor(self) -> f64 {
        match self {
            Variable::Adomww => 0.069,
            Variable::Ainww => 0.08,
            Variable::Airrww => 0.221,
            Variable::Evap => 0.072,
            Variable::Qg => 0.057,
            Variable::Qr => 0.071,
            Variable::Qs => 0.167,
            Variable::Qsb => 0.057,
            Variable::Soilmoist => 0.056,
            Variable::Swe => 0.150,
        }
    }

    /// Exact-token lookup. `"qsb"` never resolves to `Qs`.
    pub fn from_token(token: &str) -> Option<Variable> {
        Variable::ALL.into_iter().find(|v| v.keyword() == token)
    }
}

/// Factor applied to a variable token; unrecognized tokens scale by 1.0.
pub fn normalization_factor(variable: &str) -> f64 {
    Variable::from_token(variable).map_or(1.0, Variable::factor)
}

// ── Identities ────────────────────────────────────────────────────────────────

/// One simulation output: (scenario, variable, forcing-model).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableIdentity {
    pub scenario: String,
    pub forcing: String,
    pub variable: String,
}

impl VariableIdentity {
    pub fn new(scenario: &str, forcing: &str, variable: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            forcing: forcing.to_string(),
            variable: variable.to_string(),
        }
    }

    /// Parse a raw input stem `{scenario}_{forcing}_{variable}`.
    ///
    /// Scenario and forcing are single tokens; everything after the second
    /// separator is the variable name.
    pub fn parse(stem: &str) -> Result<Self> {
        let malformed = |reason: &str| FtopwspError::MalformedName {
            name: stem.to_string(),
            reason: reason.to_string(),
        };
        let mut parts = stem.splitn(3, TOKEN_SEP);
        let scenario = parts.next().unwrap_or_default();
        let forcing = parts.next().ok_or_else(|| malformed("missing forcing-model token"))?;
        let variable = parts.next().ok_or_else(|| malformed("missing variable token"))?;
        if scenario.is_empty() || forcing.is_empty() || variable.is_empty() {
            return Err(malformed("empty token"));
        }
        Ok(Self::new(scenario, forcing, variable))
    }

    pub fn stem(&self) -> String {
        format!("{}{TOKEN_SEP}{}{TOKEN_SEP}{}", self.scenario, self.forcing, self.variable)
    }

    pub fn kind(&self) -> Option<Variable> {
        Variable::from_token(&self.variable)
    }

    pub fn factor(&self) -> f64 {
        normalization_factor(&self.variable)
    }

    /// Ensemble group this unit contributes to for the given anchor.
    pub fn group(&self, variant: Variant) -> GroupKey {
        GroupKey {
            scenario: self.scenario.clone(),
            variable: self.variable.clone(),
            variant,
        }
    }
}

impl fmt::Display for VariableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

/// Which extremal anchor a distance table measures from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Max,
    Min,
}

impl Variant {
    pub const BOTH: [Variant; 2] = [Variant::Max, Variant::Min];

    fn suffix(self) -> &'static str {
        match self {
            Variant::Max => MAX_SUFFIX,
            Variant::Min => MIN_SUFFIX,
        }
    }
}

/// Ensemble grouping key: same scenario, variable and anchor; forcing differs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub scenario: String,
    pub variable: String,
    pub variant: Variant,
}

impl GroupKey {
    pub fn new(scenario: &str, variable: &str, variant: Variant) -> Self {
        Self {
            scenario: scenario.to_string(),
            variable: variable.to_string(),
            variant,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{TOKEN_SEP}{}{}", self.scenario, self.variable, self.variant.suffix())
    }
}

// ── Artifact names ────────────────────────────────────────────────────────────

/// Every table the pipeline reads or writes, named by its origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactName {
    Raw(VariableIdentity),
    Distance(VariableIdentity, Variant),
    Aggregate(GroupKey),
    Index { scenario: String },
}

impl ArtifactName {
    pub fn index(scenario: &str) -> Self {
        ArtifactName::Index {
            scenario: scenario.to_string(),
        }
    }

    /// Recover an artifact's origin from its stem. Suffixes are checked
    /// longest-first so an aggregate never parses as a distance table.
    pub fn parse(stem: &str) -> Result<Self> {
        if let Some(rest) = stem.strip_suffix(MERGE_SUFFIX) {
            for variant in Variant::BOTH {
                if let Some(head) = rest.strip_suffix(variant.suffix()) {
                    let (scenario, variable) =
                        head.split_once(TOKEN_SEP).ok_or_else(|| FtopwspError::MalformedName {
                            name: stem.to_string(),
                            reason: "aggregate needs scenario and variable tokens".into(),
                        })?;
                    if scenario.is_empty() || variable.is_empty() {
                        return Err(FtopwspError::MalformedName {
                            name: stem.to_string(),
                            reason: "empty token".into(),
                        });
                    }
                    return Ok(ArtifactName::Aggregate(GroupKey::new(scenario, variable, variant)));
                }
            }
            return Err(FtopwspError::MalformedName {
                name: stem.to_string(),
                reason: "aggregate without distance suffix".into(),
            });
        }
        for variant in Variant::BOTH {
            if let Some(head) = stem.strip_suffix(variant.suffix()) {
                return Ok(ArtifactName::Distance(VariableIdentity::parse(head)?, variant));
            }
        }
        if let Some(scenario) = stem.strip_suffix(INDEX_SUFFIX) {
            if !scenario.is_empty() && !scenario.contains(TOKEN_SEP) {
                return Ok(ArtifactName::index(scenario));
            }
        }
        Ok(ArtifactName::Raw(VariableIdentity::parse(stem)?))
    }

    pub fn stem(&self) -> String {
        match self {
            ArtifactName::Raw(id) => id.stem(),
            ArtifactName::Distance(id, variant) => format!("{}{}", id.stem(), variant.suffix()),
            ArtifactName::Aggregate(key) => format!("{key}{MERGE_SUFFIX}"),
            ArtifactName::Index { scenario } => format!("{scenario}{INDEX_SUFFIX}"),
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactName::Raw(_) => ArtifactKind::Raw,
            ArtifactName::Distance(..) => ArtifactKind::Distance,
            ArtifactName::Aggregate(_) => ArtifactKind::Aggregate,
            ArtifactName::Index { .. } => ArtifactKind::Index,
        }
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

/// Coarse artifact category, used to filter store listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Raw,
    Distance,
    Aggregate,
    Index,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_table_matches_keywords() {
        assert_eq!(normalization_factor("adomww"), 0.069);
        assert_eq!(normalization_factor("airrww"), 0.221);
        assert_eq!(normalization_factor("soilmoist"), 0.056);
        assert_eq!(normalization_factor("swe"), 0.150);
    }

    #[test]
    fn qsb_is_not_shadowed_by_qs() {
        assert_eq!(Variable::from_token("qsb"), Some(Variable::Qsb));
        assert_eq!(Variable::from_token("qs"), Some(Variable::Qs));
        assert_eq!(normalization_factor("qsb"), 0.057);
        assert_eq!(normalization_factor("qs"), 0.167);
    }

    #[test]
    fn substring_does_not_match() {
        // "qsbx" contains both "qs" and "qsb" but is neither.
        assert_eq!(Variable::from_token("qsbx"), None);
        assert_eq!(normalization_factor("qsbx"), 1.0);
        assert_eq!(normalization_factor("tws"), 1.0);
    }

    #[test]
    fn raw_stem_parses_in_token_order() {
        let id = VariableIdentity::parse("rcp26_gfdl-esm2m_airrww").unwrap();
        assert_eq!(id.scenario, "rcp26");
        assert_eq!(id.forcing, "gfdl-esm2m");
        assert_eq!(id.variable, "airrww");
        assert_eq!(id.kind(), Some(Variable::Airrww));
    }

    #[test]
    fn raw_stem_with_missing_tokens_is_malformed() {
        assert!(matches!(
            VariableIdentity::parse("rcp26_gfdl"),
            Err(FtopwspError::MalformedName { .. })
        ));
        assert!(matches!(
            VariableIdentity::parse("rcp26__qs"),
            Err(FtopwspError::MalformedName { .. })
        ));
    }

    #[test]
    fn artifact_names_round_trip() {
        let id = VariableIdentity::new("rcp60", "miroc5", "qsb");
        let names = [
            ArtifactName::Raw(id.clone()),
            ArtifactName::Distance(id.clone(), Variant::Max),
            ArtifactName::Distance(id.clone(), Variant::Min),
            ArtifactName::Aggregate(id.group(Variant::Max)),
            ArtifactName::Aggregate(id.group(Variant::Min)),
            ArtifactName::index("rcp60"),
        ];
        for name in names {
            assert_eq!(ArtifactName::parse(&name.stem()).unwrap(), name, "{name}");
        }
    }

    #[test]
    fn derived_suffixes_match_convention() {
        let id = VariableIdentity::new("rcp26", "gfdl", "adomww");
        assert_eq!(
            ArtifactName::Distance(id.clone(), Variant::Max).stem(),
            "rcp26_gfdl_adomww_minus_max_square"
        );
        assert_eq!(
            ArtifactName::Aggregate(id.group(Variant::Min)).stem(),
            "rcp26_adomww_minus_min_square_root_merge"
        );
        assert_eq!(ArtifactName::index("rcp26").stem(), "rcp26_FTOPWSP");
    }

    #[test]
    fn group_drops_forcing_token() {
        let a = VariableIdentity::new("rcp26", "gfdl", "evap").group(Variant::Max);
        let b = VariableIdentity::new("rcp26", "hadgem2-es", "evap").group(Variant::Max);
        assert_eq!(a, b);
        assert_ne!(a, VariableIdentity::new("rcp26", "gfdl", "evap").group(Variant::Min));
    }
}

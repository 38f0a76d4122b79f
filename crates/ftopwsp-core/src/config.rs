use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FtopwspError, Result};
use crate::identity::Variable;

/// Smallest forcing-model ensemble that may be aggregated.
pub const DEFAULT_MIN_ENSEMBLE_SIZE: usize = 3;

/// What the composer does with cells where `sumMax + sumMin == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenominatorPolicy {
    /// Reject the scenario and list every offending cell.
    #[default]
    Fail,
    /// Write the cell as missing and list it in the run report.
    MarkMissing,
}

/// Pipeline knobs. Defaults reproduce the reference deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub min_ensemble_size: usize,
    /// Variable keywords composed into the index, in summation order.
    pub variables: Vec<String>,
    pub denominator_policy: DenominatorPolicy,
    /// File extension of stored tables.
    pub extension: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_ensemble_size: DEFAULT_MIN_ENSEMBLE_SIZE,
            variables: Variable::ALL.iter().map(|v| v.keyword().to_string()).collect(),
            denominator_policy: DenominatorPolicy::Fail,
            extension: "csv".into(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FtopwspError::NotFound(path.display().to_string()),
            _ => FtopwspError::Io(e),
        })?;
        let config: PipelineConfig =
            serde_json::from_str(&text).map_err(|e| FtopwspError::UnreadableFormat {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let reason = if self.min_ensemble_size == 0 {
            Some("min_ensemble_size must be at least 1")
        } else if self.variables.is_empty() {
            Some("variables must not be empty")
        } else if self.extension.is_empty() {
            Some("extension must not be empty")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(FtopwspError::UnreadableFormat {
                path: path.to_path_buf(),
                reason: reason.into(),
            }),
            None => Ok(()),
        }
    }
}

/// Directory roots for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRoots {
    /// One subdirectory per hydrological model family, or a flat directory
    /// treated as a single family.
    pub input: PathBuf,
    /// Distance and aggregate artifacts, mirrored per model family.
    pub intermediate: PathBuf,
    /// Index tables and the run report.
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_track_all_ten_variables() {
        let c = PipelineConfig::default();
        assert_eq!(c.min_ensemble_size, 3);
        assert_eq!(c.variables.len(), 10);
        assert_eq!(c.variables[7], "qsb");
        assert_eq!(c.denominator_policy, DenominatorPolicy::Fail);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"min_ensemble_size": 2, "denominator_policy": "mark_missing"}}"#).unwrap();
        let c = PipelineConfig::from_json_file(f.path()).unwrap();
        assert_eq!(c.min_ensemble_size, 2);
        assert_eq!(c.denominator_policy, DenominatorPolicy::MarkMissing);
        assert_eq!(c.variables.len(), 10);
        assert_eq!(c.extension, "csv");
    }

    #[test]
    fn zero_ensemble_size_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"min_ensemble_size": 0}}"#).unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(f.path()),
            Err(FtopwspError::UnreadableFormat { .. })
        ));
    }

    #[test]
    fn missing_config_is_not_found() {
        let err = PipelineConfig::from_json_file(Path::new("/nonexistent/ftopwsp.json")).unwrap_err();
        assert!(matches!(err, FtopwspError::NotFound(_)));
    }
}

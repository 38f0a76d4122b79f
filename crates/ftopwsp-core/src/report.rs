//! Batch summary: what was produced, what was skipped and why.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use log::{info, warn};
use serde::Serialize;

use crate::error::{FtopwspError, Result};

/// One skipped unit or failed scenario, keyed by what it was.
#[derive(Debug, Clone, Serialize)]
pub struct SkipRecord {
    pub model: String,
    pub key: String,
    pub kind: &'static str,
    pub reason: String,
}

/// Index cells written as missing under `DenominatorPolicy::MarkMissing`.
#[derive(Debug, Clone, Serialize)]
pub struct DegenerateRecord {
    pub model: String,
    pub scenario: String,
    pub cells: Vec<(usize, usize)>,
}

#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    /// Index artifacts written, as `{model}/{stem}`; cross-model means have
    /// no model prefix.
    pub produced: Vec<String>,
    /// Per-unit failures: raw tables and ensemble groups.
    pub skipped: Vec<SkipRecord>,
    /// Scenario-fatal failures.
    pub failed_scenarios: Vec<SkipRecord>,
    /// Families that could not be processed at all.
    pub failed_models: Vec<SkipRecord>,
    pub degenerate_cells: Vec<DegenerateRecord>,
}

impl RunReport {
    pub fn produced(&mut self, path: String) {
        self.produced.push(path);
    }

    pub fn skip(&mut self, model: &str, key: &str, err: &FtopwspError) {
        warn!("[{model}] skipping {key}: {err}");
        self.skipped.push(record(model, key, err));
    }

    pub fn fail_scenario(&mut self, model: &str, scenario: &str, err: &FtopwspError) {
        warn!("[{model}] scenario {scenario} failed: {err}");
        self.failed_scenarios.push(record(model, scenario, err));
    }

    pub fn fail_model(&mut self, model: &str, err: &FtopwspError) {
        warn!("[{model}] model family failed: {err}");
        self.failed_models.push(record(model, model, err));
    }

    pub fn degenerate(&mut self, model: &str, scenario: &str, cells: Vec<(usize, usize)>) {
        warn!("[{model}] {scenario}: {} index cell(s) marked missing", cells.len());
        self.degenerate_cells.push(DegenerateRecord {
            model: model.to_string(),
            scenario: scenario.to_string(),
            cells,
        });
    }

    /// True when nothing was skipped, failed or marked missing.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
            && self.failed_scenarios.is_empty()
            && self.failed_models.is_empty()
            && self.degenerate_cells.is_empty()
    }

    pub fn log_summary(&self) {
        info!(
            "{} index table(s) produced, {} unit(s) skipped, {} scenario(s) failed, {} model(s) failed",
            self.produced.len(),
            self.skipped.len(),
            self.failed_scenarios.len(),
            self.failed_models.len(),
        );
        for s in &self.skipped {
            info!("  skipped  [{}] {:<45} {}", s.model, s.key, s.kind);
        }
        for s in &self.failed_scenarios {
            info!("  failed   [{}] {:<45} {}", s.model, s.key, s.kind);
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self).map_err(|e| FtopwspError::Io(e.into()))
    }
}

fn record(model: &str, key: &str, err: &FtopwspError) -> SkipRecord {
    SkipRecord {
        model: model.to_string(),
        key: key.to_string(),
        kind: err.kind(),
        reason: err.to_string(),
    }
}

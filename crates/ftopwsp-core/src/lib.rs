//! Composite hydrological stress index (FTOPWSP) from ensembles of
//! climate-forced hydrological model outputs.
//!
//! Pipeline, per hydrological model family:
//! 1. [`normalize`]: rescale each raw table onto `[0, factor]` and derive
//!    squared distances from its max and min anchors.
//! 2. [`ensemble`]: average each (scenario, variable, anchor) group across
//!    forcing models and take the square root.
//! 3. [`compose`]: `sumMax / (sumMax + sumMin)` over every tracked variable.
//!
//! Family indices for the same scenario are then averaged cell-wise.
pub mod compose;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod identity;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod table;

pub use config::{DenominatorPolicy, PipelineConfig, RunRoots};
pub use error::{FtopwspError, Result};
pub use identity::{ArtifactName, GroupKey, Variable, VariableIdentity, Variant};
pub use pipeline::run;
pub use report::RunReport;
pub use store::{CsvDirectory, MemoryStore, TableStore};
pub use table::Table;

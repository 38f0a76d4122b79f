//! Pipeline orchestrator: normalize → ensemble aggregation → index
//! composition per model family, then the cross-model mean.
//!
//! Stages run in order and each stage only reads finished artifacts of the
//! previous one, so stage boundaries are the only synchronization points.
//! Within the first two stages every unit is independent and writes to its
//! own artifact name.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::compose::{compose, cross_model_mean, IndexOutcome};
use crate::config::{PipelineConfig, RunRoots};
use crate::ensemble::{aggregate, EnsembleGroup};
use crate::error::{FtopwspError, Result};
use crate::identity::{ArtifactKind, ArtifactName, GroupKey, VariableIdentity, Variant};
use crate::normalize::normalize;
use crate::report::RunReport;
use crate::store::{CsvDirectory, TableStore};
use crate::table::Table;

/// File name of the JSON run report in the output root.
pub const REPORT_FILE: &str = "run_report.json";

// ── Unit scheduling ───────────────────────────────────────────────────────────

#[cfg(feature = "threading")]
fn map_units<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    use rayon::prelude::*;
    items.par_iter().map(f).collect()
}

#[cfg(not(feature = "threading"))]
fn map_units<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    F: Fn(&T) -> R,
{
    items.iter().map(f).collect()
}

// ── Stage 1: normalization ────────────────────────────────────────────────────

/// What stage 1 left for the rest of one family's run.
#[derive(Debug, Clone, Default)]
pub struct NormalizedSet {
    /// Every scenario named by a well-formed raw input, whether or not its
    /// units succeeded, so later stages can report scenarios that produced
    /// nothing.
    pub scenarios: BTreeSet<String>,
    /// Units whose distance artifacts were written in this run.
    pub units: Vec<VariableIdentity>,
}

/// Normalize every raw table in `raw` and write both distance artifacts of
/// each unit to `intermediate`.
pub fn normalize_stage(
    model: &str,
    raw: &dyn TableStore,
    intermediate: &dyn TableStore,
    report: &mut RunReport,
) -> Result<NormalizedSet> {
    let listing = raw.list_artifacts(ArtifactKind::Raw)?;
    for (stem, err) in &listing.rejected {
        report.skip(model, stem, err);
    }
    let ids: Vec<VariableIdentity> = listing
        .names
        .into_iter()
        .filter_map(|n| match n {
            ArtifactName::Raw(id) => Some(id),
            _ => None,
        })
        .collect();
    info!("[{model}] normalizing {} raw table(s)", ids.len());

    let results = map_units(&ids, |id| -> Result<()> {
        let table = raw.read_artifact(&ArtifactName::Raw(id.clone()))?;
        let unit = normalize(id, &table)?;
        for variant in Variant::BOTH {
            let name = ArtifactName::Distance(id.clone(), variant);
            intermediate.write_artifact(&name, unit.distance(variant))?;
        }
        Ok(())
    });

    let total = ids.len();
    let mut set = NormalizedSet::default();
    for (id, res) in ids.into_iter().zip(results) {
        set.scenarios.insert(id.scenario.clone());
        match res {
            Ok(()) => set.units.push(id),
            Err(e) => report.skip(model, &id.stem(), &e),
        }
    }
    info!("[{model}] normalized {}/{total} unit(s)", set.units.len());
    Ok(set)
}

// ── Stage 2: ensemble aggregation ─────────────────────────────────────────────

/// Group `units` by (scenario, variable, variant), aggregate each group from
/// its distance artifacts and write the aggregates back.
///
/// Only the given units are read, so distance artifacts left in
/// `intermediate` by earlier runs never join a group. Returns the keys of
/// the aggregates written.
pub fn aggregate_stage(
    model: &str,
    units: &[VariableIdentity],
    intermediate: &dyn TableStore,
    config: &PipelineConfig,
    report: &mut RunReport,
) -> BTreeSet<GroupKey> {
    let mut groups: BTreeMap<GroupKey, Vec<&VariableIdentity>> = BTreeMap::new();
    for id in units {
        for variant in Variant::BOTH {
            groups.entry(id.group(variant)).or_default().push(id);
        }
    }
    let groups: Vec<(GroupKey, Vec<&VariableIdentity>)> = groups.into_iter().collect();
    info!("[{model}] aggregating {} ensemble group(s)", groups.len());

    let results = map_units(&groups, |(key, members)| -> Result<()> {
        // Size is checked before any member is read.
        if members.len() < config.min_ensemble_size {
            return Err(FtopwspError::InsufficientEnsemble {
                group: key.to_string(),
                found: members.len(),
                required: config.min_ensemble_size,
            });
        }
        let mut group = EnsembleGroup::new(key.clone());
        for id in members {
            let table = intermediate.read_artifact(&ArtifactName::Distance((*id).clone(), key.variant))?;
            group.push(&id.forcing, table);
        }
        let merged = aggregate(&group, config.min_ensemble_size)?;
        debug!("[{model}] {key}: merged {:?}", group.forcings());
        intermediate.write_artifact(&ArtifactName::Aggregate(key.clone()), &merged)
    });

    let mut written = BTreeSet::new();
    for ((key, _), res) in groups.iter().zip(results) {
        match res {
            Ok(()) => {
                written.insert(key.clone());
            }
            Err(e) => report.skip(model, &key.to_string(), &e),
        }
    }
    info!("[{model}] aggregated {}/{} group(s)", written.len(), groups.len());
    written
}

// ── Stage 3: index composition ────────────────────────────────────────────────

/// Compose one index per scenario from the tracked variables' aggregates.
/// Only aggregates in `aggregates` are read. Every failure here is
/// scenario-fatal.
pub fn compose_stage(
    model: &str,
    scenarios: &BTreeSet<String>,
    aggregates: &BTreeSet<GroupKey>,
    intermediate: &dyn TableStore,
    output: &dyn TableStore,
    config: &PipelineConfig,
    report: &mut RunReport,
) -> BTreeMap<String, Table> {
    let mut indices = BTreeMap::new();
    for scenario in scenarios {
        match compose_scenario(scenario, aggregates, intermediate, config) {
            Ok(outcome) => {
                let name = ArtifactName::index(scenario);
                if let Err(e) = output.write_artifact(&name, &outcome.table) {
                    report.fail_scenario(model, scenario, &e);
                    continue;
                }
                if !outcome.degenerate_cells.is_empty() {
                    report.degenerate(model, scenario, outcome.degenerate_cells);
                }
                report.produced(format!("{model}/{name}"));
                indices.insert(scenario.clone(), outcome.table);
            }
            Err(e) => report.fail_scenario(model, scenario, &e),
        }
    }
    info!("[{model}] composed {}/{} scenario index(es)", indices.len(), scenarios.len());
    indices
}

fn compose_scenario(
    scenario: &str,
    aggregates: &BTreeSet<GroupKey>,
    intermediate: &dyn TableStore,
    config: &PipelineConfig,
) -> Result<IndexOutcome> {
    let read = |variable: &String, variant| {
        let key = GroupKey::new(scenario, variable, variant);
        if !aggregates.contains(&key) {
            let name = ArtifactName::Aggregate(key);
            return Err(FtopwspError::NotFound(format!("{} (not aggregated in this run)", name.stem())));
        }
        intermediate.read_artifact(&ArtifactName::Aggregate(key))
    };
    let max = config
        .variables
        .iter()
        .map(|v| read(v, Variant::Max))
        .collect::<Result<Vec<_>>>()?;
    let min = config
        .variables
        .iter()
        .map(|v| read(v, Variant::Min))
        .collect::<Result<Vec<_>>>()?;
    compose(
        scenario,
        &max.iter().collect::<Vec<_>>(),
        &min.iter().collect::<Vec<_>>(),
        config.denominator_policy,
    )
}

// ── Families and the cross-model mean ─────────────────────────────────────────

/// Run all three stages for one hydrological model family.
pub fn run_family(
    model: &str,
    raw: &dyn TableStore,
    intermediate: &dyn TableStore,
    output: &dyn TableStore,
    config: &PipelineConfig,
    report: &mut RunReport,
) -> Result<BTreeMap<String, Table>> {
    let normalized = normalize_stage(model, raw, intermediate, report)?;
    let aggregates = aggregate_stage(model, &normalized.units, intermediate, config, report);
    Ok(compose_stage(
        model,
        &normalized.scenarios,
        &aggregates,
        intermediate,
        output,
        config,
        report,
    ))
}

/// Average each scenario's index over every family that produced one and
/// write the means to `output`.
pub fn cross_model_stage(
    family_indices: &BTreeMap<String, BTreeMap<String, Table>>,
    output: &dyn TableStore,
    report: &mut RunReport,
) -> BTreeMap<String, Table> {
    let mut by_scenario: BTreeMap<&str, Vec<&Table>> = BTreeMap::new();
    for indices in family_indices.values() {
        for (scenario, table) in indices {
            by_scenario.entry(scenario.as_str()).or_default().push(table);
        }
    }

    let mut means = BTreeMap::new();
    for (scenario, tables) in by_scenario {
        let name = ArtifactName::index(scenario);
        let written = cross_model_mean(scenario, &tables)
            .and_then(|mean| output.write_artifact(&name, &mean).map(|()| mean));
        match written {
            Ok(mean) => {
                info!("{scenario}: cross-model mean over {} family index(es)", tables.len());
                report.produced(name.stem());
                means.insert(scenario.to_string(), mean);
            }
            Err(e) => report.fail_scenario("cross-model", scenario, &e),
        }
    }
    means
}

/// Model families under `input`: one per subdirectory, or `input` itself
/// when it has none.
pub fn discover_families(input: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !input.is_dir() {
        return Err(FtopwspError::NotFound(input.display().to_string()));
    }
    let mut families = Vec::new();
    for entry in fs::read_dir(input)? {
        let path = entry?.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
            families.push((name, path));
        }
    }
    if families.is_empty() {
        let name = input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("model")
            .to_string();
        families.push((name, input.to_path_buf()));
    }
    families.sort();
    Ok(families)
}

/// Run the full batch over CSV directories and write the run report.
pub fn run(config: &PipelineConfig, roots: &RunRoots) -> Result<RunReport> {
    let mut report = RunReport::default();
    let mut family_indices = BTreeMap::new();

    for (model, dir) in discover_families(&roots.input)? {
        let raw = CsvDirectory::raw_inputs(&dir, &config.extension);
        let intermediate = CsvDirectory::derived(roots.intermediate.join(&model), &config.extension);
        let output = CsvDirectory::derived(roots.output.join(&model), &config.extension);
        fs::create_dir_all(intermediate.root())?;

        info!("[{model}] processing {}", dir.display());
        match run_family(&model, &raw, &intermediate, &output, config, &mut report) {
            Ok(indices) => {
                family_indices.insert(model, indices);
            }
            Err(e) => report.fail_model(&model, &e),
        }
    }

    let output = CsvDirectory::derived(&roots.output, &config.extension);
    cross_model_stage(&family_indices, &output, &mut report);

    report.write_json(&roots.output.join(REPORT_FILE))?;
    report.log_summary();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DenominatorPolicy;
    use crate::store::MemoryStore;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const FORCINGS: [&str; 3] = ["gfdl", "hadgem2", "miroc5"];

    fn config_for(variables: &[&str]) -> PipelineConfig {
        PipelineConfig {
            variables: variables.iter().map(|v| v.to_string()).collect(),
            ..PipelineConfig::default()
        }
    }

    /// Raw tables for one scenario: every forcing gets a shifted ramp.
    fn seeded_store(scenario: &str, variables: &[&str], forcings: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (f, forcing) in forcings.iter().enumerate() {
            for (v, variable) in variables.iter().enumerate() {
                let offset = (f + v) as f64;
                let t = Table::from_rows(vec![
                    vec![offset, offset + 1.0],
                    vec![offset + 3.0, offset + 2.0],
                ])
                .unwrap();
                store = store.with(&format!("{scenario}_{forcing}_{variable}"), t);
            }
        }
        store
    }

    #[test]
    fn single_family_produces_bounded_index() {
        let vars = ["qs", "qsb", "swe"];
        let raw = seeded_store("rcp26", &vars, &FORCINGS);
        let inter = MemoryStore::new();
        let out = MemoryStore::new();
        let mut report = RunReport::default();

        let indices = run_family("cwatm", &raw, &inter, &out, &config_for(&vars), &mut report).unwrap();

        assert!(report.is_clean(), "{report:?}");
        assert_eq!(inter.len(), vars.len() * FORCINGS.len() * 2 + vars.len() * 2);
        assert!(inter.contains("rcp26_gfdl_qsb_minus_min_square"));
        assert!(inter.contains("rcp26_qsb_minus_max_square_root_merge"));
        assert!(out.contains("rcp26_FTOPWSP"));
        assert_eq!(report.produced, vec!["cwatm/rcp26_FTOPWSP".to_string()]);

        let index = &indices["rcp26"];
        assert_eq!(index.shape(), (2, 2));
        for &v in index.values() {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn ramp_index_matches_hand_computation() {
        // Every member of every group normalizes to the same grid
        // [[0, 1/3], [1, 2/3]] * factor, so each aggregate equals the
        // member's own distance root: |n - anchor|.
        let vars = ["qs"];
        let raw = seeded_store("rcp26", &vars, &FORCINGS);
        let (inter, out) = (MemoryStore::new(), MemoryStore::new());
        let mut report = RunReport::default();
        let indices = run_family("h08", &raw, &inter, &out, &config_for(&vars), &mut report).unwrap();
        let index = &indices["rcp26"];
        // cell (0, 1): n = f/3, dmax = 2f/3, dmin = f/3 → 2/3
        assert_abs_diff_eq!(index.get(0, 1), 2.0 / 3.0, epsilon = 1e-9);
        // cell (1, 0): n = f → dmax = 0 → 0
        assert_abs_diff_eq!(index.get(1, 0), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(index.get(0, 0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn undersized_group_is_skipped_and_scenario_fails() {
        let vars = ["evap"];
        let raw = seeded_store("rcp60", &vars, &FORCINGS[..2]);
        let (inter, out) = (MemoryStore::new(), MemoryStore::new());
        let mut report = RunReport::default();

        let indices = run_family("pcr", &raw, &inter, &out, &config_for(&vars), &mut report).unwrap();

        assert!(indices.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.iter().all(|s| s.kind == "insufficient_ensemble"));
        assert_eq!(report.failed_scenarios.len(), 1);
        assert_eq!(report.failed_scenarios[0].kind, "not_found");
        assert!(!inter.contains("rcp60_evap_minus_max_square_root_merge"));
    }

    #[test]
    fn lowering_minimum_admits_small_ensembles() {
        let vars = ["evap"];
        let raw = seeded_store("rcp60", &vars, &FORCINGS[..2]);
        let (inter, out) = (MemoryStore::new(), MemoryStore::new());
        let mut report = RunReport::default();
        let config = PipelineConfig {
            min_ensemble_size: 2,
            ..config_for(&vars)
        };
        let indices = run_family("pcr", &raw, &inter, &out, &config, &mut report).unwrap();
        assert!(indices.contains_key("rcp60"));
        assert!(report.is_clean());
    }

    #[test]
    fn degenerate_unit_is_isolated() {
        let vars = ["qg"];
        let raw = seeded_store("rcp26", &vars, &FORCINGS)
            .with("rcp26_extra_qg", Table::filled(2, 2, 5.0))
            .with("readme", Table::filled(1, 1, 0.0));
        let (inter, out) = (MemoryStore::new(), MemoryStore::new());
        let mut report = RunReport::default();

        let indices = run_family("cwatm", &raw, &inter, &out, &config_for(&vars), &mut report).unwrap();

        assert!(indices.contains_key("rcp26"));
        let kinds: Vec<&str> = report.skipped.iter().map(|s| s.kind).collect();
        assert!(kinds.contains(&"degenerate_range"));
        assert!(kinds.contains(&"malformed_name"));
        let degenerate = report.skipped.iter().find(|s| s.kind == "degenerate_range").unwrap();
        assert_eq!(degenerate.key, "rcp26_extra_qg");
    }

    #[test]
    fn constant_index_cells_follow_policy() {
        // One variable whose aggregates are zero in both variants at (0, 0).
        let inter = MemoryStore::new()
            .with("rcp26_qs_minus_max_square_root_merge", Table::from_rows(vec![vec![0.0, 0.1]]).unwrap())
            .with("rcp26_qs_minus_min_square_root_merge", Table::from_rows(vec![vec![0.0, 0.1]]).unwrap());
        let scenarios: BTreeSet<String> = ["rcp26".to_string()].into();
        let aggregates: BTreeSet<GroupKey> =
            Variant::BOTH.into_iter().map(|v| GroupKey::new("rcp26", "qs", v)).collect();

        let out = MemoryStore::new();
        let mut report = RunReport::default();
        let failed = compose_stage(
            "cwatm",
            &scenarios,
            &aggregates,
            &inter,
            &out,
            &config_for(&["qs"]),
            &mut report,
        );
        assert!(failed.is_empty());
        assert_eq!(report.failed_scenarios[0].kind, "degenerate_denominator");

        let mut report = RunReport::default();
        let config = PipelineConfig {
            denominator_policy: DenominatorPolicy::MarkMissing,
            ..config_for(&["qs"])
        };
        let marked = compose_stage("cwatm", &scenarios, &aggregates, &inter, &out, &config, &mut report);
        assert!(marked["rcp26"].is_missing(0, 0));
        assert_eq!(report.degenerate_cells[0].cells, vec![(0, 0)]);
    }

    #[test]
    fn rerun_ignores_distance_tables_of_rejected_unit() {
        let vars = ["qs"];
        let inter = MemoryStore::new();
        let config = config_for(&vars);

        let raw = seeded_store("rcp26", &vars, &FORCINGS);
        let mut report = RunReport::default();
        run_family("cwatm", &raw, &inter, &MemoryStore::new(), &config, &mut report).unwrap();
        assert!(report.is_clean(), "{report:?}");
        assert!(inter.contains("rcp26_miroc5_qs_minus_max_square"));

        // miroc5 now fails normalization; its old distance tables stay behind.
        let raw = seeded_store("rcp26", &vars, &FORCINGS[..2]).with("rcp26_miroc5_qs", Table::filled(2, 2, 3.0));
        let out = MemoryStore::new();
        let mut report = RunReport::default();
        let indices = run_family("cwatm", &raw, &inter, &out, &config, &mut report).unwrap();

        assert!(indices.is_empty());
        assert!(!out.contains("rcp26_FTOPWSP"));
        assert!(report.produced.is_empty());
        let kinds: Vec<&str> = report.skipped.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec!["degenerate_range", "insufficient_ensemble", "insufficient_ensemble"]);
        assert_eq!(report.failed_scenarios[0].kind, "not_found");
    }

    #[test]
    fn rerun_with_fewer_forcings_reports_undersized_groups() {
        let vars = ["swe"];
        let inter = MemoryStore::new();
        let config = config_for(&vars);

        let raw = seeded_store("rcp85", &vars, &FORCINGS);
        let mut report = RunReport::default();
        run_family("h08", &raw, &inter, &MemoryStore::new(), &config, &mut report).unwrap();
        assert_eq!(report.produced, vec!["h08/rcp85_FTOPWSP".to_string()]);

        let raw = seeded_store("rcp85", &vars, &FORCINGS[..2]);
        let mut report = RunReport::default();
        let indices = run_family("h08", &raw, &inter, &MemoryStore::new(), &config, &mut report).unwrap();

        assert!(indices.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.iter().all(|s| s.kind == "insufficient_ensemble"));
        assert_eq!(report.failed_scenarios.len(), 1);
    }

    #[test]
    fn compose_skips_aggregates_not_written_this_run() {
        let inter = MemoryStore::new()
            .with("rcp26_qs_minus_max_square_root_merge", Table::filled(1, 2, 0.1))
            .with("rcp26_qs_minus_min_square_root_merge", Table::filled(1, 2, 0.1));
        let scenarios: BTreeSet<String> = ["rcp26".to_string()].into();
        let out = MemoryStore::new();
        let mut report = RunReport::default();

        let indices = compose_stage(
            "cwatm",
            &scenarios,
            &BTreeSet::new(),
            &inter,
            &out,
            &config_for(&["qs"]),
            &mut report,
        );

        assert!(indices.is_empty());
        assert_eq!(report.failed_scenarios[0].kind, "not_found");
        assert!(out.is_empty());
    }

    #[test]
    fn stages_match_direct_computation() {
        // Holds with and without the `threading` feature.
        let vars = ["qs", "qr", "evap"];
        let forcings = ["gfdl", "hadgem2", "ipsl", "miroc5", "noresm"];
        let mut raw = MemoryStore::new();
        let mut expected = BTreeMap::new();
        let mut rng = StdRng::seed_from_u64(29);
        for variable in vars {
            for forcing in forcings {
                let data = (0..20).map(|_| rng.gen_range(-5.0..40.0)).collect();
                let table = Table::new(4, 5, data).unwrap();
                let id = VariableIdentity::new("rcp60", forcing, variable);
                let unit = normalize(&id, &table).unwrap();
                for variant in Variant::BOTH {
                    expected
                        .entry(id.group(variant))
                        .or_insert_with(|| EnsembleGroup::new(id.group(variant)))
                        .push(forcing, unit.distance(variant).clone());
                }
                raw = raw.with(&id.stem(), table);
            }
        }
        let (inter, out) = (MemoryStore::new(), MemoryStore::new());
        let mut report = RunReport::default();
        let indices = run_family("cwatm", &raw, &inter, &out, &config_for(&vars), &mut report).unwrap();
        assert!(report.is_clean(), "{report:?}");

        let mut max = Vec::new();
        let mut min = Vec::new();
        for (key, group) in &expected {
            let merged = aggregate(group, 3).unwrap();
            let written = inter.read_artifact(&ArtifactName::Aggregate(key.clone())).unwrap();
            assert_eq!(written.values(), merged.values(), "{key}");
            match key.variant {
                Variant::Max => max.push(merged),
                Variant::Min => min.push(merged),
            }
        }
        let direct = compose(
            "rcp60",
            &max.iter().collect::<Vec<_>>(),
            &min.iter().collect::<Vec<_>>(),
            DenominatorPolicy::Fail,
        )
        .unwrap();
        for (got, want) in indices["rcp60"].values().iter().zip(direct.table.values()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[cfg(feature = "threading")]
    #[test]
    fn parallel_units_keep_input_order() {
        let items: Vec<usize> = (0..1000).collect();
        let squared = map_units(&items, |&i| i * i);
        assert_eq!(squared, items.iter().map(|&i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn cross_model_mean_over_families() {
        let mut families = BTreeMap::new();
        families.insert(
            "cwatm".to_string(),
            BTreeMap::from([("rcp26".to_string(), Table::filled(1, 2, 0.2))]),
        );
        families.insert(
            "h08".to_string(),
            BTreeMap::from([
                ("rcp26".to_string(), Table::filled(1, 2, 0.6)),
                ("rcp60".to_string(), Table::filled(1, 2, 0.5)),
            ]),
        );
        families.insert(
            "pcr".to_string(),
            BTreeMap::from([("rcp60".to_string(), Table::filled(3, 3, 0.5))]),
        );
        let out = MemoryStore::new();
        let mut report = RunReport::default();
        let means = cross_model_stage(&families, &out, &mut report);

        assert_abs_diff_eq!(means["rcp26"].get(0, 1), 0.4, epsilon = 1e-12);
        assert!(out.contains("rcp26_FTOPWSP"));
        assert!(!means.contains_key("rcp60"));
        assert_eq!(report.failed_scenarios[0].kind, "shape_mismatch");
    }

    #[test]
    fn csv_batch_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let roots = RunRoots {
            input: tmp.path().join("input"),
            intermediate: tmp.path().join("work"),
            output: tmp.path().join("out"),
        };
        for model in ["cwatm", "h08"] {
            let dir = roots.input.join(model);
            fs::create_dir_all(&dir).unwrap();
            for (f, forcing) in FORCINGS.iter().enumerate() {
                // The first forcing leaves one cell blank.
                let gap = if f == 0 { String::new() } else { (f + 1).to_string() };
                let body = format!("month,b1,b2\n2006-01,{},{}\n2006-02,{},{gap}\n", f, f + 4, f + 2);
                fs::write(dir.join(format!("rcp26_{forcing}_airrww.csv")), body).unwrap();
            }
        }
        let report = run(&config_for(&["airrww"]), &roots).unwrap();

        assert!(report.failed_scenarios.is_empty(), "{report:?}");
        assert!(roots.output.join("cwatm").join("rcp26_FTOPWSP.csv").is_file());
        assert!(roots.output.join("rcp26_FTOPWSP.csv").is_file());
        let merged = roots.intermediate.join("h08").join("rcp26_airrww_minus_min_square_root_merge.csv");
        assert!(merged.is_file());
        assert!(roots.output.join(REPORT_FILE).is_file());

        let mean = CsvDirectory::derived(&roots.output, "csv").read("rcp26_FTOPWSP").unwrap();
        assert_eq!(mean.columns(), &["b1".to_string(), "b2".to_string()]);
        assert_eq!(mean.missing_count(), 0);
    }

    #[test]
    fn flat_input_is_one_family() {
        let tmp = tempfile::tempdir().unwrap();
        let flat = tmp.path().join("cwatm");
        fs::create_dir_all(&flat).unwrap();
        let families = discover_families(&flat).unwrap();
        assert_eq!(families, vec![("cwatm".to_string(), flat)]);
    }
}

//! Batch runner: computes FTOPWSP index tables for every model family and
//! scenario under an input root.
//!
//! Input layout:   {input}/{model}/{scenario}_{forcing}_{variable}.csv
//! Intermediates:  {intermediate}/{model}/…_minus_{max,min}_square[_root_merge].csv
//! Outputs:        {output}/{model}/{scenario}_FTOPWSP.csv, {output}/{scenario}_FTOPWSP.csv

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ftopwsp_core::{pipeline, DenominatorPolicy, PipelineConfig, RunRoots};
use log::info;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ftopwsp", about = "Compute FTOPWSP stress index tables from model ensemble outputs")]
struct Args {
    /// Root of raw simulation tables, one sub-directory per model family.
    #[arg(short, long)]
    input: PathBuf,

    /// Root for distance and aggregate artifacts.
    #[arg(long, default_value = "data/intermediate")]
    intermediate: PathBuf,

    /// Root for index tables and run_report.json.
    #[arg(short, long, default_value = "data/ftopwsp")]
    output: PathBuf,

    /// JSON pipeline configuration; omitted fields use defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the minimum forcing-model ensemble size.
    #[arg(long)]
    min_ensemble: Option<usize>,

    /// Write zero-denominator index cells as blanks instead of failing the scenario.
    #[arg(long)]
    mark_missing: bool,

    /// Debug-level logging (per-table ranges, group membership).
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(n) = args.min_ensemble {
        if n == 0 {
            bail!("--min-ensemble must be at least 1");
        }
        config.min_ensemble_size = n;
    }
    if args.mark_missing {
        config.denominator_policy = DenominatorPolicy::MarkMissing;
    }
    Ok(config)
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = load_config(&args)?;
    info!(
        "min ensemble {}, {} tracked variable(s), denominator policy {:?}",
        config.min_ensemble_size,
        config.variables.len(),
        config.denominator_policy
    );

    let roots = RunRoots {
        input: args.input,
        intermediate: args.intermediate,
        output: args.output,
    };
    let report = pipeline::run(&config, &roots)
        .with_context(|| format!("running pipeline over {}", roots.input.display()))?;

    info!("report -> {}", roots.output.join(pipeline::REPORT_FILE).display());
    if report.produced.is_empty() {
        bail!(
            "no index tables produced ({} unit(s) skipped, {} scenario(s) failed)",
            report.skipped.len(),
            report.failed_scenarios.len()
        );
    }
    Ok(())
}

//! Output file plumbing for the CLI

use std::fs;

use anyhow::{anyhow, Result};

use popsim_core::cfg::Config;
use popsim_core::io::{CorrCsvSink, JsonSink, OutputterGroup, OutputterGroupBuilder};

use crate::cfg::RunConfig;

/// Build the sink group the simulation results are recorded into
///
/// Every run produces a JSON results document and an aggregated correlation
/// CSV, both under the configured output directory and filename prefix.
pub fn outputter_group_for_cli(run_cfg: &RunConfig, configs: &[Config]) -> Result<OutputterGroup> {
    fs::create_dir_all(&run_cfg.outdir)?;

    let json_path = run_cfg.outdir.join(format!("{}_res.json", run_cfg.prefix));
    let csv_path = run_cfg.outdir.join(format!("{}_res.csv", run_cfg.prefix));
    let timed = run_cfg.sample_time > 0;

    OutputterGroupBuilder::default()
        .sink(Box::new(JsonSink::new(json_path)))
        .sink(Box::new(CorrCsvSink::new(csv_path, configs.to_vec(), timed)))
        .build()
        .map_err(|e| anyhow!("{}", e))
}

//! Library for concerns and functions specific to the popsim CLI, rather than
//! the popsim library
//!
//! This is kept separate to "dogfood" the popsim_core interface by making the
//! CLI use it, to prevent overly tight coupling of the CLI and the main lib,
//! and to keep CLI concerns totally out of the public simulation interface.

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use rayon::prelude::*;

use popsim_core::cfg::Config;
use popsim_core::io::{read_config_document, read_parameter_set, CalcRes, Results};
use popsim_core::pop::shock::{self, Dilution};
use popsim_core::pop::{self, Pop};
use popsim_core::sim::{self, Engine, SimRng};
use popsim_core::stats::{coalescence, cov, diversity};

use cfg::{CliCommand, ExpandConfig, RunConfig};
use io::outputter_group_for_cli;

mod cfg;
mod io;

pub use cfg::CliConfig;

/// Run the CLI as specified by some `CliConfig`
pub fn run_cli_config(cfg: CliConfig) -> Result<()> {
    match cfg.command {
        CliCommand::Single(run_cfg) => run_simulations(&run_cfg, SimulationMode::Single),
        CliCommand::Twopop(run_cfg) => run_simulations(&run_cfg, SimulationMode::MultiPop),
        CliCommand::Expand(expand_cfg) => run_expand(&expand_cfg),
    }
}

/// Which populations of the config document a simulation uses
#[derive(Clone, Copy, PartialEq, Eq)]
enum SimulationMode {
    /// Only the first configured population
    Single,
    /// Every configured population, coupled by outbound transfer
    MultiPop,
}

/// Per-replicate options resolved from flags and configs
struct ReplicateOptions {
    num_gen: u32,
    sample_size: usize,
    max_l: usize,
    sample_step: u32,
    sample_time: u32,
    dilution: f64,
    coal_times: bool,
}

/// Run the simulations and write their outputs
fn run_simulations(run_cfg: &RunConfig, mode: SimulationMode) -> Result<()> {
    let mut configs = read_config_document(&run_cfg.config_path)?.into_configs(1);
    if configs.is_empty() {
        bail!("no population configurations in {}", run_cfg.config_path.display());
    }
    if mode == SimulationMode::Single {
        configs.truncate(1);
    }
    for cfg in &configs {
        cfg.validate()?;
    }

    if run_cfg.sample_time > 0 && run_cfg.sample_step == 0 {
        bail!("--sample-time needs a positive --sample-step");
    }
    if run_cfg.dilution != 0.0 && !(0.0..1.0).contains(&run_cfg.dilution) {
        bail!("--dilution must be a fraction in (0, 1)");
    }
    if run_cfg.dilution > 0.0 {
        for cfg in &configs {
            if (cfg.size as f64 * run_cfg.dilution) < 1.0 {
                bail!(
                    "--dilution {} leaves no survivors in a population of {}",
                    run_cfg.dilution,
                    cfg.size
                );
            }
        }
    }

    let options = ReplicateOptions {
        num_gen: if run_cfg.generations > 0 {
            run_cfg.generations
        } else {
            configs[0].effective_num_gen()
        },
        sample_size: run_cfg.sample_size,
        max_l: run_cfg.max_l,
        sample_step: run_cfg.sample_step,
        sample_time: run_cfg.sample_time,
        dilution: run_cfg.dilution,
        coal_times: run_cfg.coal_times,
    };

    let engine = Engine::new(&configs)?;
    let master_seed = sim::master_seed(run_cfg.seed.or(configs[0].seed));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(run_cfg.ncpu)
        .build()
        .context("failed to build the worker pool")?;

    let bar = styled_bar(run_cfg.replicates as u64, "Replicate:");
    let replicate_results: Vec<Vec<Results>> = pool.install(|| {
        (0..run_cfg.replicates)
            .into_par_iter()
            .map(|replicate| {
                let mut rng = sim::replicate_rng(master_seed, replicate as u64);
                let results = run_replicate(&configs, &engine, &options, &mut rng);
                bar.inc(1);
                results
            })
            .collect()
    });
    bar.finish_and_clear();

    let mut outputter = outputter_group_for_cli(run_cfg, &configs)?;
    for results in replicate_results.iter().flatten() {
        outputter.record(results)?;
    }
    outputter
        .finish()
        .context("failed to properly output results")
}

/// Simulate one replicate and compute its statistics, including any periodic
/// snapshots
///
/// With a dilution fraction set, every population goes through a bottleneck
/// and regrows to full size once the initial run is over, so the snapshots
/// trace the recovery of diversity after the shock.
fn run_replicate(
    configs: &[Config],
    engine: &Engine,
    options: &ReplicateOptions,
    rng: &mut SimRng,
) -> Vec<Results> {
    let mut pops = generate_populations(configs, rng);

    engine.run(&mut pops, options.num_gen, rng);

    if options.dilution > 0.0 {
        pops = bottleneck(pops, options.dilution, rng);
    }

    if options.sample_time == 0 {
        return vec![collect_stats(configs, &pops, options, None, rng)];
    }

    let mut all = Vec::with_capacity(options.sample_time as usize + 1);
    all.push(collect_stats(configs, &pops, options, Some(0), rng));
    for snapshot in 1..=options.sample_time {
        engine.run(&mut pops, options.sample_step, rng);
        all.push(collect_stats(configs, &pops, options, Some(snapshot), rng));
    }
    all
}

/// Put every population through a dilution bottleneck and regrow it to its
/// previous size
fn bottleneck(pops: Vec<Pop>, factor: f64, rng: &mut SimRng) -> Vec<Pop> {
    let dilution = Dilution { factor };
    pops.into_iter()
        .map(|p| {
            let full_size = p.size();
            let mut reduced = dilution.reduce(p, rng);
            shock::recover(&mut reduced, full_size, rng);
            reduced
        })
        .collect()
}

/// Create the populations of one replicate
///
/// Populations of equal genome length start from one shared random ancestor,
/// so cross-population diversity starts at zero; otherwise each population
/// draws its own ancestor.
fn generate_populations(configs: &[Config], rng: &mut SimRng) -> Vec<Pop> {
    let shared_ancestry = configs
        .iter()
        .all(|c| c.length == configs[0].length && c.alphabet == configs[0].alphabet);

    if shared_ancestry {
        let ancestor =
            pop::random_ancestor(configs[0].length, &configs[0].alphabet_symbols(), rng);
        configs
            .iter()
            .map(|c| Pop::from_ancestor(&ancestor, c.size, c.circular))
            .collect()
    } else {
        configs.iter().map(|c| Pop::random(c, rng)).collect()
    }
}

/// Compute the per-population and cross-population statistics of one state
fn collect_stats(
    configs: &[Config],
    pops: &[Pop],
    options: &ReplicateOptions,
    snapshot: Option<u32>,
    rng: &mut SimRng,
) -> Results {
    let mut calc_results = Vec::new();

    for (k, p1) in pops.iter().enumerate() {
        let (ks, vd) = diversity::calc_ks(options.sample_size, rng, &[p1]);
        let profile = cov::calc_cov(options.sample_size, options.max_l, rng, &[p1]);
        let (t2, t3, t4) = if options.coal_times {
            (
                Some(coalescence::calc_t2(p1, options.sample_size, rng)),
                Some(coalescence::calc_t3(p1, options.sample_size, rng)),
                Some(coalescence::calc_t4(p1, options.sample_size, rng)),
            )
        } else {
            (None, None, None)
        };

        calc_results.push(CalcRes {
            index: k.to_string(),
            ks,
            vd,
            cm: profile.cm,
            ct: profile.ct,
            cr: profile.cr,
            cs: profile.cs,
            num_gen: p1.generation(),
            t2,
            t3,
            t4,
        });
    }

    for ((k, p1), (j, p2)) in pops.iter().enumerate().tuple_combinations() {
        let (ks, vd) = diversity::cross_ks(options.sample_size, rng, p1, p2);
        let profile = cov::cross_cov(options.sample_size, options.max_l, rng, p1, p2);
        calc_results.push(CalcRes {
            index: format!("{}_{}", k, j),
            ks,
            vd,
            cm: profile.cm,
            ct: profile.ct,
            cr: profile.cr,
            cs: profile.cs,
            num_gen: p1.generation(),
            t2: None,
            t3: None,
            t4: None,
        });
    }

    Results {
        pop_configs: configs.to_vec(),
        snapshot,
        calc_results,
    }
}

/// Expand a parameter set file into a configuration list
fn run_expand(cfg: &ExpandConfig) -> Result<()> {
    let set = read_parameter_set(&cfg.input_path)?;
    let configs = set.expand(cfg.replicates);

    let mut writer = BufWriter::new(File::create(&cfg.output_path)?);
    serde_json::to_writer(&mut writer, &configs)?;
    writeln!(writer)?;
    writer.flush()?;

    println!(
        "expanded {} configurations into {}",
        configs.len(),
        cfg.output_path.display()
    );
    Ok(())
}

/// Get a `ProgressBar` with style options and a custom prefix set, abandoned
/// cleanly if a worker panics
fn styled_bar(len: u64, prefix: &str) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(len, ProgressDrawTarget::stderr_nohz())
        .with_style(ProgressStyle::default_bar().template("{prefix} {wide_bar} [{pos}/{len}]"));
    bar.set_prefix(prefix);

    // ProgressBars are Arc under the hood, clone is Arc clone
    // Need to do this so bars don't interfere with panic messages
    let handle = bar.clone();
    let old_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        handle.abandon();
        old_hook(info);
    }));

    bar
}

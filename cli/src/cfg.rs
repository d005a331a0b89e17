//! Configuration options specifically for the CLI portion of popsim
use std::path::PathBuf;

use clap::{AppSettings, Parser, Subcommand};

/// Configuration options for popsim command line app subcommands
#[derive(Parser)]
#[clap(version, about = "Population evolution simulator with horizontal gene transfer")]
pub struct CliConfig {
    /// Subcommands of popsim
    #[clap(subcommand)]
    pub command: CliCommand,
}

/// Subcommand definitions
#[derive(Subcommand)]
#[clap(setting = AppSettings::DeriveDisplayOrder)]
pub enum CliCommand {
    /// Simulate a single population
    Single(RunConfig),
    /// Simulate interacting populations
    Twopop(RunConfig),
    /// Expand a parameter set into a list of population configs
    Expand(ExpandConfig),
}

/// Command line inputs shared by the simulation subcommands
#[derive(Parser)]
#[clap(version, setting = AppSettings::DeriveDisplayOrder)]
pub struct RunConfig {
    /// Configuration file in JSON or YAML format
    #[clap(short = 'c', long = "config", default_value = "config.yaml")]
    pub config_path: PathBuf,

    /// Output directory
    #[clap(short = 'o', long = "outdir", default_value = ".")]
    pub outdir: PathBuf,

    /// Output filename prefix
    #[clap(short = 'p', long = "prefix", default_value = "popsim")]
    pub prefix: String,

    /// Worker pool size (0 means all available CPUs)
    #[clap(long, default_value = "0")]
    pub ncpu: usize,

    /// Number of reproduction events per replicate (0 means 10 * N^2)
    #[clap(short = 'g', long = "generation", default_value = "0")]
    pub generations: u32,

    /// Number of replicates
    #[clap(short = 'r', long = "replicates", default_value = "1")]
    pub replicates: usize,

    /// Number of sample pairs drawn for the diversity and correlation
    /// estimates
    #[clap(long = "sample-size", default_value = "1000")]
    pub sample_size: usize,

    /// Maximum lag of the correlation profiles
    #[clap(long = "maxl", default_value = "100")]
    pub max_l: usize,

    /// Generations between periodic statistic snapshots
    #[clap(long = "sample-step", default_value = "0")]
    pub sample_step: u32,

    /// Number of periodic snapshots after the initial run
    #[clap(long = "sample-time", default_value = "0")]
    pub sample_time: u32,

    /// Bottleneck every population after the initial run, keeping this
    /// fraction of it before regrowing to full size (0 disables)
    #[clap(long = "dilution", default_value = "0")]
    pub dilution: f64,

    /// Also sample coalescence times (T2, T3, T4)
    #[clap(long = "coal-times")]
    pub coal_times: bool,

    /// Seed for the master RNG; seeded from entropy when absent
    #[clap(long)]
    pub seed: Option<u64>,
}

/// Expand a parameter set file into the Cartesian product of its axes
#[derive(Parser)]
#[clap(version, setting = AppSettings::DeriveDisplayOrder)]
pub struct ExpandConfig {
    /// Path of the parameter set file (JSON or YAML)
    pub input_path: PathBuf,

    /// Path the expanded configuration list is written to (JSON)
    pub output_path: PathBuf,

    /// Number of replicate copies of each parameter combination
    #[clap(short = 'r', long = "replicates", default_value = "1")]
    pub replicates: usize,
}

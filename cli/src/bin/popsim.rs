use clap::Parser;

use popsim_cli::{run_cli_config, CliConfig};

/// Entry-point for the main "popsim" command-line executable
fn main() {
    let cfg = CliConfig::parse();
    if let Err(error) = run_cli_config(cfg) {
        eprintln!("Error: {:#}", error);
        std::process::exit(1);
    }
}

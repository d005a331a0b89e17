//! Result records, output sinks and configuration input parsing

use std::io::Write;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::cfg::Config;

mod input;
mod output;

pub use input::{read_config_document, read_parameter_set, ConfigDocument};
pub use output::{
    CalcRes, Collector, CorrCsvSink, CorrRow, JsonSink, OutputterGroup, OutputterGroupBuilder,
    Results, ResultsSink,
};

/// Type of output a file contains
#[derive(Serialize, Deserialize, Copy, Clone, Debug)]
enum OutputMode {
    /// Full per-replicate results, as a JSON array
    Results,
    /// Correlation summary aggregated across replicates, as CSV
    CorrSummary,
}

/// Information marking output files as produced by a specific version of the
/// simulator
#[derive(Serialize, Deserialize, Debug)]
struct Metadata {
    name: String,
    version: String,
    description: String,
    output_mode: OutputMode,
}

impl Metadata {
    /// Construct a `Metadata` instance for the current version of the code
    /// and the desired `OutputMode`
    fn new(output_mode: OutputMode) -> Self {
        Self {
            name: "popsim".to_string(),
            version: get_current_version_str().to_string(),
            description: "popsim simulation of population evolution with horizontal gene transfer"
                .to_string(),
            output_mode,
        }
    }
}

/// Current crate version as defined in Cargo.toml
fn get_current_version_str() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Write `Metadata` and the population configs as a header using the
/// provided `writer`
///
/// Allows an optional prefix for the header lines (e.g. for comments)
fn initialize_output<W: Write>(
    writer: &mut W,
    configs: &[Config],
    output_mode: OutputMode,
    header_prefix: &'static str,
) -> Result<()> {
    write!(writer, "{}", header_prefix)?;
    let metadata = Metadata::new(output_mode);
    serde_json::to_writer(writer.by_ref(), &metadata)?;
    writeln!(writer)?;

    write!(writer, "{}", header_prefix)?;
    serde_json::to_writer(writer.by_ref(), configs)?;
    writeln!(writer)?;

    Ok(())
}

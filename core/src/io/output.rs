//! Output sinks: JSON result documents and aggregated correlation CSV

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Result;
use derive_builder::Builder;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::cfg::Config;
use crate::io::{initialize_output, OutputMode};
use crate::stats::MeanVar;

/// Per-pair or per-population calculation results of one replicate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalcRes {
    /// Which populations the sample pairs were drawn from, e.g. `"0"` or
    /// `"0_1"` for a cross-population sample
    pub index: String,
    /// Mean pairwise diversity
    pub ks: f64,
    /// Variance of pairwise diversity
    pub vd: f64,
    /// Mutation correlation profile
    pub cm: Vec<f64>,
    /// Total correlation profile
    pub ct: Vec<f64>,
    /// Reference correlation profile
    pub cr: Vec<f64>,
    /// Substitution correlation profile
    pub cs: Vec<f64>,
    /// Reproduction events the replicate ran for
    pub num_gen: u32,
    /// Pair coalescence-time samples, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t2: Option<Vec<f64>>,
    /// Triple coalescence-time samples, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t3: Option<Vec<f64>>,
    /// Quadruple coalescence-time samples, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t4: Option<Vec<f64>>,
}

/// All calculation results of one replicate, tagged with its configurations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Results {
    /// Configurations of the simulated populations
    pub pop_configs: Vec<Config>,
    /// Snapshot index for time-sampled runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<u32>,
    /// One record per population and per population pair
    pub calc_results: Vec<CalcRes>,
}

/// A sink results are recorded into
///
/// Sinks buffer in memory and only touch the filesystem in `finish`, so a
/// failed run leaves no partial output file behind.
pub trait ResultsSink {
    /// Record the results of one replicate
    fn record(&mut self, results: &Results) -> Result<()>;
    /// Write the collected output to its destination
    fn finish(&mut self) -> Result<()>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// OutputterGroup
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// A handler which broadcasts recording calls to a group of underlying sinks
#[allow(missing_docs)] // Builder will not have doc comment
#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct OutputterGroup {
    /// Sinks results are broadcast to
    #[builder(setter(each(name = "sink")), default)]
    sinks: Vec<Box<dyn ResultsSink>>,
}

impl OutputterGroup {
    /// Record one replicate's results in every managed sink
    pub fn record(&mut self, results: &Results) -> Result<()> {
        for sink in &mut self.sinks {
            sink.record(results)?;
        }
        Ok(())
    }

    /// Finish every managed sink
    pub fn finish(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.finish()?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// JsonSink
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Sink writing the full results as a JSON array
pub struct JsonSink {
    path: PathBuf,
    results: Vec<Results>,
}

impl JsonSink {
    /// Create a sink that will write to `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            results: Vec::new(),
        }
    }
}

impl ResultsSink for JsonSink {
    fn record(&mut self, results: &Results) -> Result<()> {
        self.results.push(results.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(&mut writer, &self.results)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// CorrCsvSink
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Manually moving onto the next record in the `csv` crate requires writing an
/// empty record
const EMPTY_CSV_RECORD: [&[u8]; 0] = [];

/// Buffer capacity to use for the CSV writer
///
/// Set at 128 KB
const CSV_BUFFER_CAPACITY: usize = 128 * (1 << 10);

/// Label of rows derived from the total correlation profile
const CT_TYPE_TAG: &str = "P2";

/// Sink aggregating the total correlation across replicates into CSV rows
/// `lag, mean, variance, n, type, bucket[, snapshot]`
pub struct CorrCsvSink {
    path: PathBuf,
    configs: Vec<Config>,
    collector: Collector,
    timed: bool,
}

impl CorrCsvSink {
    /// Create a sink that will write to `path`; `timed` enables the
    /// snapshot column
    pub fn new(path: PathBuf, configs: Vec<Config>, timed: bool) -> Self {
        Self {
            path,
            configs,
            collector: Collector::new(),
            timed,
        }
    }
}

impl ResultsSink for CorrCsvSink {
    fn record(&mut self, results: &Results) -> Result<()> {
        for res in &results.calc_results {
            self.collector.add(&res.index, results.snapshot, &res.ct);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        initialize_output(&mut writer, &self.configs, OutputMode::CorrSummary, "# ")?;

        let mut writer = csv::WriterBuilder::new()
            .buffer_capacity(CSV_BUFFER_CAPACITY)
            .from_writer(writer);

        let mut header = vec!["l", "m", "v", "n", "t", "b"];
        if self.timed {
            header.push("g");
        }
        writer.write_record(header)?;

        for row in self.collector.rows() {
            writer.write_field(row.lag.to_string())?;
            writer.write_field(format!("{}", row.mean))?;
            writer.write_field(format!("{}", row.variance))?;
            writer.write_field(row.n.to_string())?;
            writer.write_field(row.type_tag)?;
            writer.write_field(&row.bucket)?;
            if self.timed {
                writer.write_field(row.snapshot.unwrap_or(0).to_string())?;
            }
            writer.write_record(EMPTY_CSV_RECORD)?;
        }

        writer.flush()?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Collector
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Order-independent accumulator of per-lag correlation values across
/// replicates, bucketed by sample key and snapshot
#[derive(Debug, Default)]
pub struct Collector {
    buckets: HashMap<(String, Option<u32>), Vec<MeanVar>>,
}

/// One aggregated CSV row
#[derive(Debug, Clone, PartialEq)]
pub struct CorrRow {
    /// Correlation lag
    pub lag: usize,
    /// Mean across replicates
    pub mean: f64,
    /// Sample variance across replicates
    pub variance: f64,
    /// Number of replicates aggregated
    pub n: u64,
    /// Short label of the source profile
    pub type_tag: &'static str,
    /// Sample key, e.g. `"0"` or `"0_1"`
    pub bucket: String,
    /// Snapshot index for time-sampled runs
    pub snapshot: Option<u32>,
}

impl Collector {
    /// Empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one replicate's per-lag values into a bucket
    pub fn add(&mut self, bucket: &str, snapshot: Option<u32>, values: &[f64]) {
        let lags = self
            .buckets
            .entry((bucket.to_string(), snapshot))
            .or_default();
        if lags.len() < values.len() {
            lags.resize_with(values.len(), MeanVar::new);
        }
        for (accumulator, &value) in lags.iter_mut().zip(values) {
            accumulator.increment(value);
        }
    }

    /// Fold another collector in; insertion order does not matter
    pub fn merge(&mut self, other: Collector) {
        for (key, lags) in other.buckets {
            let own = self.buckets.entry(key).or_default();
            if own.len() < lags.len() {
                own.resize_with(lags.len(), MeanVar::new);
            }
            for (accumulator, incoming) in own.iter_mut().zip(&lags) {
                accumulator.merge(incoming);
            }
        }
    }

    /// Aggregated rows, sorted by bucket, snapshot and lag
    pub fn rows(&self) -> Vec<CorrRow> {
        let mut keys: Vec<_> = self.buckets.keys().collect();
        keys.sort();

        let mut rows = Vec::new();
        for key in keys {
            let (bucket, snapshot) = key;
            for (lag, accumulator) in self.buckets[key].iter().enumerate() {
                rows.push(CorrRow {
                    lag,
                    mean: accumulator.mean.result(),
                    variance: accumulator.var.result(),
                    n: accumulator.mean.n(),
                    type_tag: CT_TYPE_TAG,
                    bucket: bucket.clone(),
                    snapshot: *snapshot,
                });
            }
        }
        rows
    }
}

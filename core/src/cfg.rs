//! Configuration types for populations and parameter sweeps

use itertools::iproduct;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Options for a single simulated population
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Population size (number of genome slots)
    pub size: usize,
    /// Genome length in sites
    pub length: usize,
    /// Number of reproduction events per replicate
    ///
    /// Zero means "use the default of `10 * size^2`", see
    /// [`Config::effective_num_gen`]
    pub num_gen: u32,
    /// Alphabet the genome symbols are drawn from
    pub alphabet: String,
    /// Whether the genome wraps around at the end
    pub circular: bool,
    /// Reproduction model
    pub sample_method: SampleMethod,
    /// Distribution of transferred fragment lengths
    pub fragment_generator: FragmentGenerator,
    /// Mutation parameters
    pub mutation: MutationConfig,
    /// Horizontal transfer parameters
    pub transfer: TransferConfig,
    /// Seed for the master RNG; seeded from entropy when absent
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            size: 0,
            length: 0,
            num_gen: 0,
            alphabet: "ACGT".to_string(),
            circular: true,
            sample_method: SampleMethod::default(),
            fragment_generator: FragmentGenerator::default(),
            mutation: MutationConfig::default(),
            transfer: TransferConfig::default(),
            seed: None,
        }
    }
}

/// Mutation rates for a population
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MutationConfig {
    /// Neutral point-mutation rate, per site per generation
    pub rate: f64,
    /// Beneficial (fitness) mutation parameters
    pub beneficial: BeneficialConfig,
}

/// Parameters of the beneficial mutation process
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BeneficialConfig {
    /// Beneficial mutation rate, per site per generation
    pub rate: f64,
    /// Fitness effect scale `S`
    pub s: f64,
    /// Distribution of the fitness increment
    pub delta: FitnessDelta,
    /// Shape parameter, used only by the gamma delta distribution
    pub gamma_shape: f64,
}

impl Default for BeneficialConfig {
    fn default() -> Self {
        Self {
            rate: 0.0,
            s: 0.0,
            delta: FitnessDelta::default(),
            gamma_shape: 1.0,
        }
    }
}

/// Horizontal transfer rates and fragment lengths
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferConfig {
    /// Transfers between genomes of this population
    #[serde(rename = "in")]
    pub incoming: TransferSpec,
    /// Transfers exchanged with other populations
    #[serde(rename = "out")]
    pub outgoing: TransferSpec,
}

/// Rate and fragment length of one transfer channel
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferSpec {
    /// Transfer rate, per site per generation
    pub rate: f64,
    /// Fragment length (the mean, for the exponential generator)
    pub fragment: usize,
}

/// Reproduction models supported by the engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleMethod {
    /// One birth-death pair per generation
    #[default]
    Moran,
    /// Full-population resampling each generation
    WrightFisher,
    /// Poisson offspring with a size-regulating chemical potential
    LinearSelection,
}

/// Distributions of transferred fragment lengths
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentGenerator {
    /// Always the configured length
    #[default]
    Constant,
    /// Floor of an exponential with the configured mean
    Exponential,
}

/// Distributions of the beneficial fitness increment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessDelta {
    /// Always `S`
    #[default]
    Step,
    /// Exponential with mean `S`
    Exponential,
    /// Gaussian with scale `S`
    Gaussian,
    /// Gamma with the configured shape and scale `S`
    Gamma,
}

/// A configuration rejected before the simulation starts
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Population size must be positive
    #[error("population size must be positive")]
    ZeroPopulationSize,
    /// Genome length must be positive
    #[error("genome length must be positive")]
    ZeroGenomeLength,
    /// The alphabet needs at least two distinct symbols to mutate between
    #[error("alphabet needs at least 2 distinct symbols, found {found}")]
    AlphabetTooSmall {
        /// Number of distinct symbols found
        found: usize,
    },
    /// Event rates must be non-negative
    #[error("{name} rate must be non-negative, found {rate}")]
    NegativeRate {
        /// Which rate was rejected
        name: &'static str,
        /// The offending value
        rate: f64,
    },
    /// A transfer channel with a positive rate needs a positive fragment length
    #[error("{name} transfer has a positive rate but a zero fragment length")]
    ZeroFragment {
        /// Which transfer channel was rejected
        name: &'static str,
    },
    /// The gamma fitness-delta distribution needs a positive shape
    #[error("gamma fitness delta needs a positive shape, found {shape}")]
    NonPositiveGammaShape {
        /// The offending value
        shape: f64,
    },
    /// Populations exchanging fragments must share a genome length
    #[error("populations {a} and {b} exchange fragments but have different genome lengths")]
    MismatchedLengths {
        /// First population index
        a: usize,
        /// Second population index
        b: usize,
    },
    /// At least one population configuration is required
    #[error("no population configurations were supplied")]
    Empty,
}

impl Config {
    /// Number of reproduction events to run, applying the `10 * N^2` default
    pub fn effective_num_gen(&self) -> u32 {
        if self.num_gen == 0 {
            10 * (self.size * self.size) as u32
        } else {
            self.num_gen
        }
    }

    /// Distinct alphabet symbols, in first-appearance order
    pub fn alphabet_symbols(&self) -> Vec<u8> {
        let mut symbols: Vec<u8> = Vec::new();
        for &b in self.alphabet.as_bytes() {
            if !symbols.contains(&b) {
                symbols.push(b);
            }
        }
        symbols
    }

    /// Reject configurations the engine must not start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::ZeroPopulationSize);
        }
        if self.length == 0 {
            return Err(ConfigError::ZeroGenomeLength);
        }
        let found = self.alphabet_symbols().len();
        if found < 2 {
            return Err(ConfigError::AlphabetTooSmall { found });
        }

        let rates = [
            ("mutation", self.mutation.rate),
            ("beneficial mutation", self.mutation.beneficial.rate),
            ("inbound transfer", self.transfer.incoming.rate),
            ("outbound transfer", self.transfer.outgoing.rate),
        ];
        for (name, rate) in rates {
            if !rate.is_finite() || rate < 0.0 {
                return Err(ConfigError::NegativeRate { name, rate });
            }
        }

        if self.transfer.incoming.rate > 0.0 && self.transfer.incoming.fragment == 0 {
            return Err(ConfigError::ZeroFragment { name: "inbound" });
        }
        if self.transfer.outgoing.rate > 0.0 && self.transfer.outgoing.fragment == 0 {
            return Err(ConfigError::ZeroFragment { name: "outbound" });
        }

        if self.mutation.beneficial.rate > 0.0
            && self.mutation.beneficial.delta == FitnessDelta::Gamma
            && self.mutation.beneficial.gamma_shape <= 0.0
        {
            return Err(ConfigError::NonPositiveGammaShape {
                shape: self.mutation.beneficial.gamma_shape,
            });
        }

        Ok(())
    }
}

/// A sweep over population parameters
///
/// Expansion is the full Cartesian product of the axes, optionally duplicated
/// for replicate runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSet {
    /// Population sizes
    pub sizes: Vec<usize>,
    /// Genome lengths
    pub lengths: Vec<usize>,
    /// Neutral mutation rates
    pub mutation_rates: Vec<f64>,
    /// Inbound transfer rates
    pub transfer_in_rates: Vec<f64>,
    /// Inbound fragment lengths
    pub transfer_in_frags: Vec<usize>,
    /// Outbound transfer rates
    pub transfer_out_rates: Vec<f64>,
    /// Outbound fragment lengths
    pub transfer_out_frags: Vec<usize>,
    /// Alphabet shared by every expanded config
    pub alphabet: String,
    /// Beneficial mutation rates
    pub beneficial_mutation_rates: Vec<f64>,
    /// Beneficial fitness effects `S`
    pub fitness_effects: Vec<f64>,
}

impl ParameterSet {
    /// Expand into the Cartesian product of all axes, `replicates` copies each
    pub fn expand(&self, replicates: usize) -> Vec<Config> {
        let mut configs = Vec::new();
        for (&size, &length, &mutation, &tra_in, &frag_in, &tra_out, &frag_out, &ben, &s) in iproduct!(
            &self.sizes,
            &self.lengths,
            &self.mutation_rates,
            &self.transfer_in_rates,
            &self.transfer_in_frags,
            &self.transfer_out_rates,
            &self.transfer_out_frags,
            &self.beneficial_mutation_rates,
            &self.fitness_effects
        ) {
            for _ in 0..replicates {
                let mut cfg = Config {
                    size,
                    length,
                    alphabet: self.alphabet.clone(),
                    ..Config::default()
                };
                cfg.mutation.rate = mutation;
                cfg.mutation.beneficial.rate = ben;
                cfg.mutation.beneficial.s = s;
                cfg.transfer.incoming.rate = tra_in;
                cfg.transfer.incoming.fragment = frag_in;
                cfg.transfer.outgoing.rate = tra_out;
                cfg.transfer.outgoing.fragment = frag_out;
                cfg.num_gen = cfg.effective_num_gen();
                configs.push(cfg);
            }
        }
        configs
    }
}

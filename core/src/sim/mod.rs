//! The event-driven evolution engine
//!
//! Events are tagged variants carrying their per-generation rate and target
//! population, built once from the configurations and dispatched in a flat
//! apply loop. Each generation emits exactly one reproduction event followed
//! by a Poisson burst of auxiliary events; within a replicate the loop is
//! strictly sequential, so population state needs no locking.

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::cfg::{Config, ConfigError, FragmentGenerator, SampleMethod};
use crate::pop::mutate::{self, FitnessMutator};
use crate::pop::sampler;
use crate::pop::transfer::{self, FragSize};
use crate::pop::Pop;

pub mod distr;
pub mod kernels;

/// RNG used for the simulations
///
/// One instance per replicate worker; the event stream and every operator
/// share it, so a replicate is deterministic given its seed.
pub type SimRng = Pcg64;

/// Instantiate the master RNG from a seed, or from system entropy
pub fn sim_rng(seed: Option<u64>) -> SimRng {
    match seed {
        Some(seed) => SimRng::seed_from_u64(seed),
        None => SimRng::from_entropy(),
    }
}

/// Derive the RNG of one replicate from the master seed and its index
pub fn replicate_rng(master_seed: u64, index: u64) -> SimRng {
    SimRng::seed_from_u64(master_seed.wrapping_add(index.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
}

/// Resolve the master seed, drawing one from entropy when none is given
pub fn master_seed(seed: Option<u64>) -> u64 {
    match seed {
        Some(seed) => seed,
        None => sim_rng(None).gen(),
    }
}

/// A schedulable event: a rate, an operation and a target population
#[derive(Clone, Copy, Debug)]
pub struct Event {
    /// Aggregate firing rate, per generation
    pub rate: f64,
    /// The operation applied when the event fires
    pub kind: EventKind,
    /// Index of the population the event acts on
    pub target: usize,
}

/// Operations an event can apply to its target population
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// One reproduction step of the target's configured sampler
    Reproduce,
    /// One neutral point mutation
    PointMutate,
    /// One fitness mutation
    FitnessMutate,
    /// One transfer between two genomes of the target population
    TransferWithin,
    /// One transfer into the target from the donor population
    TransferBetween {
        /// Index of the donor population
        donor: usize,
    },
}

/// Randomly emit one event, with probability proportional to its rate
///
/// Zero-rate events are never selected.
pub fn emit<'a, R: Rng>(events: &'a [Event], rng: &mut R) -> &'a Event {
    let weights: Vec<f64> = events.iter().map(|e| e.rate).collect();
    &events[distr::roulette_wheel_select(&weights, rng)]
}

/// Per-population operator parameters, precomputed from its `Config`
#[derive(Clone, Debug)]
struct PopParams {
    alphabet: Vec<u8>,
    sample_method: SampleMethod,
    frag_in: FragSize,
    frag_out: FragSize,
    fitness: FitnessMutator,
}

impl PopParams {
    fn new(cfg: &Config) -> Self {
        Self {
            alphabet: cfg.alphabet_symbols(),
            sample_method: cfg.sample_method,
            frag_in: frag_size(cfg.fragment_generator, cfg.transfer.incoming.fragment),
            frag_out: frag_size(cfg.fragment_generator, cfg.transfer.outgoing.fragment),
            fitness: FitnessMutator {
                scale: cfg.mutation.beneficial.s,
                shape: cfg.mutation.beneficial.gamma_shape,
                delta: cfg.mutation.beneficial.delta,
            },
        }
    }
}

fn frag_size(generator: FragmentGenerator, fragment: usize) -> FragSize {
    match generator {
        FragmentGenerator::Constant => FragSize::Constant(fragment),
        FragmentGenerator::Exponential => FragSize::Exponential {
            mean: fragment as f64,
        },
    }
}

/// The rate-scheduled evolution engine over one or more populations
///
/// Construction validates the configurations and precomputes the event pools;
/// [`Engine::run`] then drives the populations for a generation budget.
#[derive(Clone, Debug)]
pub struct Engine {
    params: Vec<PopParams>,
    repro_events: Vec<Event>,
    aux_events: Vec<Event>,
    /// Poisson mean of auxiliary events per generation
    aux_rate: f64,
}

impl Engine {
    /// Build the engine and its event pools from population configurations
    ///
    /// Per population: a reproduction event with rate `N`, a point-mutation
    /// event with rate `mu * N * L`, a fitness-mutation event with rate
    /// `r_b * N * L` and an intra-transfer event with rate `r_in * N * L`.
    /// Per ordered pair `(i, j)`, `i != j`: an inter-transfer event targeting
    /// `i` with donor `j` and rate `r_out * N_i * L_i * N_j / sum_{k != i} N_k`.
    pub fn new(configs: &[Config]) -> Result<Self, ConfigError> {
        if configs.is_empty() {
            return Err(ConfigError::Empty);
        }
        for cfg in configs {
            cfg.validate()?;
        }

        let mut repro_events = Vec::new();
        let mut aux_events = Vec::new();

        for (i, cfg) in configs.iter().enumerate() {
            let genome_events = (cfg.size * cfg.length) as f64;

            repro_events.push(Event {
                rate: cfg.size as f64,
                kind: EventKind::Reproduce,
                target: i,
            });
            aux_events.push(Event {
                rate: cfg.mutation.rate * genome_events,
                kind: EventKind::PointMutate,
                target: i,
            });
            aux_events.push(Event {
                rate: cfg.mutation.beneficial.rate * genome_events,
                kind: EventKind::FitnessMutate,
                target: i,
            });
            aux_events.push(Event {
                rate: cfg.transfer.incoming.rate * genome_events,
                kind: EventKind::TransferWithin,
                target: i,
            });

            if cfg.transfer.outgoing.rate > 0.0 {
                let donor_total: usize = configs
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, c)| c.size)
                    .sum();
                for (j, donor_cfg) in configs.iter().enumerate() {
                    if j == i {
                        continue;
                    }
                    if donor_cfg.length != cfg.length {
                        return Err(ConfigError::MismatchedLengths { a: i, b: j });
                    }
                    // the outbound rate is split across donors by their size
                    aux_events.push(Event {
                        rate: cfg.transfer.outgoing.rate
                            * genome_events
                            * donor_cfg.size as f64
                            / donor_total as f64,
                        kind: EventKind::TransferBetween { donor: j },
                        target: i,
                    });
                }
            }
        }

        let total_size: usize = configs.iter().map(|c| c.size).sum();
        let aux_rate = aux_events.iter().map(|e| e.rate).sum::<f64>() / total_size as f64;

        Ok(Self {
            params: configs.iter().map(PopParams::new).collect(),
            repro_events,
            aux_events,
            aux_rate,
        })
    }

    /// Poisson mean of auxiliary events per generation
    pub fn aux_rate(&self) -> f64 {
        self.aux_rate
    }

    /// The auxiliary (non-reproduction) event pool
    pub fn aux_events(&self) -> &[Event] {
        &self.aux_events
    }

    /// Drive `pops` for `num_gen` reproduction events
    pub fn run<R: Rng>(&self, pops: &mut [Pop], num_gen: u32, rng: &mut R) {
        for _ in 0..num_gen {
            self.step(pops, rng);
        }
    }

    /// One generation: a reproduction event, then a Poisson burst of
    /// auxiliary events
    ///
    /// The reproduction event is chosen across populations with probability
    /// proportional to their size. When every auxiliary rate is zero the
    /// burst is always empty and the stream degenerates to reproduction only.
    pub fn step<R: Rng>(&self, pops: &mut [Pop], rng: &mut R) {
        let event = *emit(&self.repro_events, rng);
        self.apply(&event, pops, rng);

        let count = distr::poisson(self.aux_rate, rng);
        for _ in 0..count {
            let event = *emit(&self.aux_events, rng);
            self.apply(&event, pops, rng);
        }
    }

    /// Apply one event to its target population
    pub fn apply<R: Rng>(&self, event: &Event, pops: &mut [Pop], rng: &mut R) {
        let params = &self.params[event.target];
        match event.kind {
            EventKind::Reproduce => {
                let p = &mut pops[event.target];
                match params.sample_method {
                    SampleMethod::Moran => sampler::moran(p, rng),
                    SampleMethod::WrightFisher => sampler::wright_fisher(p, rng),
                    SampleMethod::LinearSelection => sampler::linear_selection(p, rng),
                }
            }
            EventKind::PointMutate => {
                mutate::point_mutate(&mut pops[event.target], &params.alphabet, rng)
            }
            EventKind::FitnessMutate => params.fitness.operate(&mut pops[event.target], rng),
            EventKind::TransferWithin => {
                transfer::transfer_within(&mut pops[event.target], &params.frag_in, rng)
            }
            EventKind::TransferBetween { donor } => {
                let (receiver, donor_pop) = pair_mut(pops, event.target, donor);
                transfer::transfer_between(receiver, donor_pop, &params.frag_out, rng);
            }
        }
    }
}

/// Borrow one population mutably and another immutably
fn pair_mut(pops: &mut [Pop], target: usize, donor: usize) -> (&mut Pop, &Pop) {
    debug_assert_ne!(target, donor);
    if target < donor {
        let (head, tail) = pops.split_at_mut(donor);
        (&mut head[target], &tail[0])
    } else {
        let (head, tail) = pops.split_at_mut(target);
        (&mut tail[0], &head[donor])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pop::Genome;

    fn config(size: usize, length: usize) -> Config {
        Config {
            size,
            length,
            ..Config::default()
        }
    }

    #[test]
    fn event_rates_follow_the_construction_formulas() {
        let mut a = config(10, 100);
        a.mutation.rate = 0.01;
        a.transfer.incoming.rate = 0.001;
        a.transfer.incoming.fragment = 10;
        a.transfer.outgoing.rate = 0.002;
        a.transfer.outgoing.fragment = 10;
        let mut b = config(30, 100);
        b.mutation.rate = 0.01;

        let engine = Engine::new(&[a, b]).unwrap();

        assert_eq!(engine.repro_events.len(), 2);
        assert_eq!(engine.repro_events[0].rate, 10.0);
        assert_eq!(engine.repro_events[1].rate, 30.0);

        let rate_of = |kind: EventKind, target: usize| -> f64 {
            engine
                .aux_events
                .iter()
                .find(|e| e.kind == kind && e.target == target)
                .map(|e| e.rate)
                .unwrap()
        };

        assert!((rate_of(EventKind::PointMutate, 0) - 0.01 * 1000.0).abs() < 1e-12);
        assert!((rate_of(EventKind::TransferWithin, 0) - 0.001 * 1000.0).abs() < 1e-12);
        // outbound: r_out * N_0 * L_0 * N_1 / (total size excluding pop 0)
        let expected = 0.002 * 1000.0 * 30.0 / 30.0;
        assert!((rate_of(EventKind::TransferBetween { donor: 1 }, 0) - expected).abs() < 1e-12);
        // pop 1 has no outbound rate, so no inter-transfer targets it
        assert!(!engine
            .aux_events
            .iter()
            .any(|e| matches!(e.kind, EventKind::TransferBetween { .. }) && e.target == 1));

        let total_aux: f64 = engine.aux_events.iter().map(|e| e.rate).sum();
        assert!((engine.aux_rate() - total_aux / 40.0).abs() < 1e-12);
    }

    #[test]
    fn mismatched_lengths_are_rejected_when_transfers_connect_pops() {
        let mut a = config(10, 100);
        a.transfer.outgoing.rate = 0.01;
        a.transfer.outgoing.fragment = 10;
        let b = config(10, 50);

        assert!(matches!(
            Engine::new(&[a, b]),
            Err(ConfigError::MismatchedLengths { .. })
        ));
    }

    #[test]
    fn empty_config_list_is_rejected() {
        assert!(matches!(Engine::new(&[]), Err(ConfigError::Empty)));
    }

    #[test]
    fn emit_matches_rate_fractions() {
        let mut rng = sim_rng(Some(61));
        let events: Vec<Event> = [0.5, 0.9, 0.0, 0.6]
            .iter()
            .enumerate()
            .map(|(i, &rate)| Event {
                rate,
                kind: EventKind::PointMutate,
                target: i,
            })
            .collect();

        let mut counts = [0u32; 4];
        let draws = 1_000_000;
        for _ in 0..draws {
            counts[emit(&events, &mut rng).target] += 1;
        }

        assert_eq!(counts[2], 0, "zero-rate event fired");
        let total_rate = 2.0;
        for (i, &count) in counts.iter().enumerate() {
            let expected = events[i].rate / total_rate;
            let observed = count as f64 / draws as f64;
            assert!(
                (observed - expected).abs() < 2e-3,
                "event {}: expected {}, observed {}",
                i,
                expected,
                observed
            );
        }
    }

    #[test]
    fn run_advances_exactly_num_gen_generations() {
        let mut cfg = config(10, 50);
        cfg.mutation.rate = 0.01;
        let engine = Engine::new(std::slice::from_ref(&cfg)).unwrap();

        let mut rng = sim_rng(Some(62));
        let mut pops = vec![Pop::random(&cfg, &mut rng)];
        engine.run(&mut pops, 500, &mut rng);

        assert_eq!(pops[0].generation(), 500);
        assert_eq!(pops[0].size(), 10);
        assert!(pops[0].genomes().iter().all(|g| g.length() == 50));
    }

    #[test]
    fn zero_aux_rates_degenerate_to_reproduction_only() {
        let cfg = config(5, 20);
        let engine = Engine::new(std::slice::from_ref(&cfg)).unwrap();
        assert_eq!(engine.aux_rate(), 0.0);

        let mut rng = sim_rng(Some(63));
        let ancestor = Genome::new(vec![b'A'; 20]);
        let mut pops = vec![Pop::from_ancestor(&ancestor, 5, false)];
        engine.run(&mut pops, 100, &mut rng);

        assert_eq!(pops[0].generation(), 100);
        // nothing but reproduction ever fires, so no sequence can change
        assert!(pops[0].genomes().iter().all(|g| g.seq() == ancestor.seq()));
    }

    #[test]
    fn inter_transfer_moves_symbols_between_populations() {
        let mut a = config(5, 40);
        a.transfer.outgoing.rate = 0.5;
        a.transfer.outgoing.fragment = 10;
        let b = config(5, 40);

        let engine = Engine::new(&[a, b]).unwrap();
        let mut rng = sim_rng(Some(64));
        let mut pops = vec![
            Pop::from_ancestor(&Genome::new(vec![b'A'; 40]), 5, true),
            Pop::from_ancestor(&Genome::new(vec![b'C'; 40]), 5, true),
        ];
        engine.run(&mut pops, 200, &mut rng);

        let foreign: usize = pops[0]
            .genomes()
            .iter()
            .map(|g| g.seq().iter().filter(|&&s| s == b'C').count())
            .sum();
        assert!(foreign > 0, "no donor symbols reached the receiver");
        // transfers point into population 0 only
        assert!(pops[1]
            .genomes()
            .iter()
            .all(|g| g.seq().iter().all(|&s| s == b'C')));
    }
}

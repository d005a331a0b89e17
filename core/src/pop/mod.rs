//! Population state: genomes, lineage frontiers and their construction

use std::sync::Arc;

use rand::Rng;

use crate::cfg::Config;

pub mod mutate;
pub mod sampler;
pub mod shock;
pub mod transfer;

/// A genome: an ordered buffer of alphabet symbols plus a scalar fitness
#[derive(Clone, Debug, PartialEq)]
pub struct Genome {
    sequence: Vec<u8>,
    fitness: f64,
}

impl Genome {
    /// Create a neutral genome from a symbol buffer
    pub fn new(sequence: Vec<u8>) -> Self {
        Self {
            sequence,
            fitness: 0.0,
        }
    }

    /// Number of sites
    pub fn length(&self) -> usize {
        self.sequence.len()
    }

    /// Read-only view of the symbol buffer
    pub fn seq(&self) -> &[u8] {
        &self.sequence
    }

    /// Mutable view of the symbol buffer
    pub(crate) fn seq_mut(&mut self) -> &mut [u8] {
        &mut self.sequence
    }

    /// Current fitness
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Shift the fitness by `delta`
    pub(crate) fn add_fitness(&mut self, delta: f64) {
        self.fitness += delta;
    }
}

/// A node of the reverse lineage tree
///
/// Children point at parents and nodes are never mutated after creation, so
/// ancestors stay alive exactly as long as some frontier node transitively
/// references them.
#[derive(Debug)]
pub struct Lineage {
    /// Generation at which this node was produced
    pub birth_time: u32,
    /// Parent node; `None` for the roots planted at population creation
    pub parent: Option<Arc<Lineage>>,
}

impl Lineage {
    /// A root node with birth time zero
    pub fn root() -> Arc<Self> {
        Arc::new(Self {
            birth_time: 0,
            parent: None,
        })
    }

    /// A child of `parent` born at `birth_time`
    pub fn child(parent: &Arc<Lineage>, birth_time: u32) -> Arc<Self> {
        Arc::new(Self {
            birth_time,
            parent: Some(Arc::clone(parent)),
        })
    }

    /// Whether two frontier nodes are direct siblings: born at the same
    /// generation from the same parent node (two planted roots count)
    pub fn siblings(a: &Arc<Lineage>, b: &Arc<Lineage>) -> bool {
        if a.birth_time != b.birth_time {
            return false;
        }
        match (&a.parent, &b.parent) {
            (Some(x), Some(y)) => Arc::ptr_eq(x, y),
            (None, None) => true,
            _ => false,
        }
    }
}

/// A population of genomes with its living lineage frontier
///
/// `genomes` and `lineages` stay the same length at every quiescent point
/// between events, and every genome has the same length. The generation
/// counter advances by exactly one per reproduction event.
#[derive(Debug)]
pub struct Pop {
    pub(crate) genomes: Vec<Genome>,
    pub(crate) lineages: Vec<Arc<Lineage>>,
    pub(crate) generation: u32,
    pub(crate) circular: bool,
    pub(crate) target_size: usize,
}

impl Pop {
    /// Create a population of `size` independent copies of `ancestor`
    ///
    /// Every slot gets its own lineage root.
    pub fn from_ancestor(ancestor: &Genome, size: usize, circular: bool) -> Self {
        let genomes = vec![ancestor.clone(); size];
        let lineages = (0..size).map(|_| Lineage::root()).collect();
        Self {
            genomes,
            lineages,
            generation: 0,
            circular,
            target_size: size,
        }
    }

    /// Create a population from a freshly drawn random ancestral genome
    pub fn random<R: Rng>(cfg: &Config, rng: &mut R) -> Self {
        let ancestor = random_ancestor(cfg.length, &cfg.alphabet_symbols(), rng);
        Self::from_ancestor(&ancestor, cfg.size, cfg.circular)
    }

    /// Current number of genome slots
    pub fn size(&self) -> usize {
        self.genomes.len()
    }

    /// Genome length, or zero for an empty population
    pub fn length(&self) -> usize {
        self.genomes.first().map_or(0, Genome::length)
    }

    /// Generation counter
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Whether genomes wrap around at the end
    pub fn circular(&self) -> bool {
        self.circular
    }

    /// Size the selection samplers drive the population toward
    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// Read-only view of the genomes
    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    /// The living lineage frontier, one node per genome slot
    pub fn lineages(&self) -> &[Arc<Lineage>] {
        &self.lineages
    }

    /// Arithmetic mean fitness over all genomes
    pub fn mean_fit(&self) -> f64 {
        if self.genomes.is_empty() {
            return 0.0;
        }
        let total: f64 = self.genomes.iter().map(Genome::fitness).sum();
        total / self.genomes.len() as f64
    }
}

/// Draw a random ancestral genome of `length` symbols from `alphabet`
pub fn random_ancestor<R: Rng>(length: usize, alphabet: &[u8], rng: &mut R) -> Genome {
    let sequence = (0..length)
        .map(|_| alphabet[rng.gen_range(0, alphabet.len())])
        .collect();
    Genome::new(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn from_ancestor_clones_every_slot() {
        let ancestor = Genome::new(b"ACGTACGT".to_vec());
        let p = Pop::from_ancestor(&ancestor, 5, false);

        assert_eq!(p.size(), 5);
        assert_eq!(p.length(), 8);
        assert_eq!(p.lineages().len(), 5);
        assert_eq!(p.generation(), 0);
        assert!(p.genomes().iter().all(|g| g.seq() == ancestor.seq()));
    }

    #[test]
    fn random_population_uses_the_alphabet() {
        let mut rng = Pcg64::seed_from_u64(7);
        let cfg = Config {
            size: 4,
            length: 50,
            ..Config::default()
        };
        let p = Pop::random(&cfg, &mut rng);

        assert_eq!(p.size(), 4);
        assert_eq!(p.length(), 50);
        for g in p.genomes() {
            assert!(g.seq().iter().all(|b| b"ACGT".contains(b)));
        }
        // all slots share one ancestor
        assert!(p.genomes().windows(2).all(|w| w[0].seq() == w[1].seq()));
    }

    #[test]
    fn sibling_test_follows_parent_pointers() {
        let root = Lineage::root();
        let other_root = Lineage::root();
        let a = Lineage::child(&root, 3);
        let b = Lineage::child(&root, 3);
        let c = Lineage::child(&root, 4);
        let d = Lineage::child(&other_root, 3);

        assert!(Lineage::siblings(&a, &b));
        assert!(!Lineage::siblings(&a, &c));
        assert!(!Lineage::siblings(&a, &d));
        // planted roots coalesce at generation zero
        assert!(Lineage::siblings(&root, &other_root));
    }

    #[test]
    fn mean_fit_averages_fitness() {
        let ancestor = Genome::new(b"AC".to_vec());
        let mut p = Pop::from_ancestor(&ancestor, 4, false);
        p.genomes[0].add_fitness(0.2);
        p.genomes[1].add_fitness(0.6);
        assert!((p.mean_fit() - 0.2).abs() < 1e-12);
    }
}

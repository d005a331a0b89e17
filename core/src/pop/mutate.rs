//! Point and fitness mutation operators

use rand::Rng;

use crate::cfg::FitnessDelta;
use crate::pop::Pop;
use crate::sim::distr;

/// Mutate one uniformly chosen site of one uniformly chosen genome
///
/// The replacement symbol is drawn uniformly from `alphabet` excluding the
/// current symbol, so a firing always changes the sequence. Fitness is left
/// untouched.
pub fn point_mutate<R: Rng>(p: &mut Pop, alphabet: &[u8], rng: &mut R) {
    if p.size() == 0 || p.length() == 0 {
        return;
    }
    let g = rng.gen_range(0, p.size());
    let site = rng.gen_range(0, p.length());

    let current = p.genomes[g].seq()[site];
    let choices: Vec<u8> = alphabet.iter().copied().filter(|&b| b != current).collect();
    let replacement = choices[rng.gen_range(0, choices.len())];
    p.genomes[g].seq_mut()[site] = replacement;
}

/// Mutator that shifts the fitness of a uniformly chosen genome
///
/// The increment is drawn from a pluggable delta distribution; the sequence is
/// unchanged.
#[derive(Clone, Copy, Debug)]
pub struct FitnessMutator {
    /// Scale `S` of the increment distribution
    pub scale: f64,
    /// Shape parameter, used by the gamma distribution only
    pub shape: f64,
    /// Which delta distribution to draw from
    pub delta: FitnessDelta,
}

impl FitnessMutator {
    /// Apply one fitness mutation to a random genome of `p`
    pub fn operate<R: Rng>(&self, p: &mut Pop, rng: &mut R) {
        if p.size() == 0 {
            return;
        }
        let g = rng.gen_range(0, p.size());
        let delta = self.draw_delta(rng);
        p.genomes[g].add_fitness(delta);
    }

    fn draw_delta<R: Rng>(&self, rng: &mut R) -> f64 {
        match self.delta {
            FitnessDelta::Step => self.scale,
            FitnessDelta::Exponential => distr::exponential(self.scale, rng),
            FitnessDelta::Gaussian => distr::gaussian(self.scale, rng),
            FitnessDelta::Gamma => distr::gamma(self.shape, self.scale, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pop::Genome;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn pop(size: usize, length: usize) -> Pop {
        Pop::from_ancestor(&Genome::new(vec![b'A'; length]), size, false)
    }

    #[test]
    fn point_mutation_always_changes_one_site() {
        let mut rng = Pcg64::seed_from_u64(21);
        let alphabet = b"ACGT";
        for _ in 0..200 {
            let mut p = pop(5, 30);
            point_mutate(&mut p, alphabet, &mut rng);

            let changed: usize = p
                .genomes()
                .iter()
                .map(|g| g.seq().iter().filter(|&&b| b != b'A').count())
                .sum();
            assert_eq!(changed, 1);
            assert!(p.genomes().iter().all(|g| g.length() == 30));
            assert!(p.genomes().iter().all(|g| g.fitness() == 0.0));
        }
    }

    #[test]
    fn point_mutation_never_picks_the_current_symbol() {
        let mut rng = Pcg64::seed_from_u64(22);
        let mut p = pop(1, 2);
        // two-symbol alphabet: mutation must flip A <-> C every time
        for step in 0..50 {
            point_mutate(&mut p, b"AC", &mut rng);
            let flipped = p.genomes()[0].seq().iter().filter(|&&b| b == b'C').count();
            assert_eq!(flipped % 2, (step + 1) % 2, "flip count changes parity");
        }
    }

    #[test]
    fn step_mutator_adds_exactly_s() {
        let mut rng = Pcg64::seed_from_u64(23);
        let mutator = FitnessMutator {
            scale: 0.25,
            shape: 1.0,
            delta: FitnessDelta::Step,
        };
        let mut p = pop(3, 4);
        for _ in 0..8 {
            mutator.operate(&mut p, &mut rng);
        }

        let total: f64 = p.genomes().iter().map(Genome::fitness).sum();
        assert!((total - 8.0 * 0.25).abs() < 1e-12);
        // sequences untouched
        assert!(p.genomes().iter().all(|g| g.seq() == b"AAAA"));
    }

    #[test]
    fn exponential_mutator_is_positive_with_mean_s() {
        let mut rng = Pcg64::seed_from_u64(24);
        let mutator = FitnessMutator {
            scale: 0.1,
            shape: 1.0,
            delta: FitnessDelta::Exponential,
        };
        let mut p = pop(1, 1);
        let rounds = 20_000;
        for _ in 0..rounds {
            mutator.operate(&mut p, &mut rng);
        }
        let mean = p.genomes()[0].fitness() / rounds as f64;
        assert!((mean - 0.1).abs() < 0.01, "mean delta {}", mean);
    }
}

//! Population shocks: dilution bottlenecks and regrowth

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::pop::{Lineage, Pop};

/// A bottleneck keeping a uniformly sampled fraction of the population
#[derive(Clone, Copy, Debug)]
pub struct Dilution {
    /// Fraction of slots that survive
    pub factor: f64,
}

impl Dilution {
    /// Reduce `p` to `factor * size` uniformly chosen survivors
    ///
    /// Genomes move together with their frontier nodes; the generation counter
    /// of the reduced population restarts at zero while the lineage history is
    /// kept intact. The target size is unchanged so a selection sampler will
    /// grow the population back.
    pub fn reduce<R: Rng>(&self, p: Pop, rng: &mut R) -> Pop {
        let final_size = (p.size() as f64 * self.factor) as usize;
        let mut indices: Vec<usize> = (0..p.size()).collect();
        indices.shuffle(rng);
        indices.truncate(final_size);

        let mut genomes = Vec::with_capacity(final_size);
        let mut lineages = Vec::with_capacity(final_size);
        for &i in &indices {
            genomes.push(p.genomes[i].clone());
            lineages.push(Arc::clone(&p.lineages[i]));
        }

        Pop {
            genomes,
            lineages,
            generation: 0,
            circular: p.circular,
            target_size: p.target_size,
        }
    }
}

/// Regrow `p` to `final_size` by repeated uniform copying
///
/// Each step copies one uniformly chosen genome into a new slot; the chosen
/// slot's frontier node is split into fresh siblings, as in a reproduction
/// event, without advancing the generation counter.
pub fn recover<R: Rng>(p: &mut Pop, final_size: usize, rng: &mut R) {
    while p.size() < final_size {
        let index = rng.gen_range(0, p.size());
        let daughter = p.genomes[index].clone();
        p.genomes.push(daughter);

        let parent = Arc::clone(&p.lineages[index]);
        p.lineages[index] = Lineage::child(&parent, p.generation);
        p.lineages.push(Lineage::child(&parent, p.generation));
    }
}

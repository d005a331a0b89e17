//! Reproduction samplers
//!
//! Each firing advances the generation counter by exactly one and leaves
//! `|genomes| == |lineages|`.

use std::mem;
use std::sync::Arc;

use hashbrown::HashMap;
use rand::Rng;

use crate::pop::{Lineage, Pop};
use crate::sim::distr;

/// One Moran birth-death step
///
/// A death slot is drawn uniformly and a birth slot by roulette wheel over
/// `exp(fitness - mean_fitness)`. The newborn overwrites the death slot with a
/// clone of the birth genome, and both slots get fresh sibling lineage nodes
/// below the birth slot's old frontier node. A self-birth (`d == b`) still
/// advances the generation counter and refreshes the frontier entry.
pub fn moran<R: Rng>(p: &mut Pop, rng: &mut R) {
    let n = p.size();
    let d = rng.gen_range(0, n);

    let mean_fit = p.mean_fit();
    let weights: Vec<f64> = p
        .genomes
        .iter()
        .map(|g| (g.fitness() - mean_fit).exp())
        .collect();
    let b = distr::roulette_wheel_select(&weights, rng);

    p.generation += 1;
    if d != b {
        p.genomes[d] = p.genomes[b].clone();
    }

    let parent = Arc::clone(&p.lineages[b]);
    p.lineages[b] = Lineage::child(&parent, p.generation);
    p.lineages[d] = Lineage::child(&parent, p.generation);
}

/// One Wright-Fisher generation: full resampling of the population
///
/// Each of the `n` new slots draws a uniform parent. The first draw of a
/// parent takes the parent's genome without copying; repeat draws deep-clone.
/// Genomes and lineage frontier are swapped in atomically at the end.
pub fn wright_fisher<R: Rng>(p: &mut Pop, rng: &mut R) {
    let n = p.size();
    let new_generation = p.generation + 1;

    let mut remaining: Vec<Option<_>> = mem::take(&mut p.genomes).into_iter().map(Some).collect();
    let old_lineages = mem::take(&mut p.lineages);

    let mut new_genomes: Vec<crate::pop::Genome> = Vec::with_capacity(n);
    let mut new_lineages = Vec::with_capacity(n);
    // slot the first draw of each parent landed in, for later clones
    let mut first_use: HashMap<usize, usize> = HashMap::new();

    for slot in 0..n {
        let parent = rng.gen_range(0, n);
        let genome = match remaining[parent].take() {
            Some(g) => {
                first_use.insert(parent, slot);
                g
            }
            None => new_genomes[first_use[&parent]].clone(),
        };
        new_genomes.push(genome);
        new_lineages.push(Lineage::child(&old_lineages[parent], new_generation));
    }

    p.genomes = new_genomes;
    p.lineages = new_lineages;
    p.generation = new_generation;
}

/// One linear-selection generation
///
/// Every genome leaves `Poisson(exp(fitness - psi))` offspring, where the
/// chemical potential `psi = mean_fitness - (1 - n / target)` drives the
/// realized size toward the target. The first offspring of a parent takes the
/// parent genome without copying; the realized size may land on either side of
/// the target.
pub fn linear_selection<R: Rng>(p: &mut Pop, rng: &mut R) {
    let n = p.size();
    let mean_fit = p.mean_fit();
    let size_ratio = n as f64 / p.target_size as f64;
    let cpot = mean_fit - (1.0 - size_ratio);
    let new_generation = p.generation + 1;

    let old_genomes = mem::take(&mut p.genomes);
    let old_lineages = mem::take(&mut p.lineages);

    let mut new_genomes = Vec::with_capacity(n);
    let mut new_lineages = Vec::with_capacity(n);

    for (i, genome) in old_genomes.into_iter().enumerate() {
        let mean_offspring = (genome.fitness() - cpot).exp();
        let num_offspring = distr::poisson(mean_offspring, rng);
        if num_offspring == 0 {
            continue;
        }

        let parent = &old_lineages[i];
        let first_slot = new_genomes.len();
        new_genomes.push(genome);
        new_lineages.push(Lineage::child(parent, new_generation));
        for _ in 1..num_offspring {
            let clone = new_genomes[first_slot].clone();
            new_genomes.push(clone);
            new_lineages.push(Lineage::child(parent, new_generation));
        }
    }

    p.genomes = new_genomes;
    p.lineages = new_lineages;
    p.generation = new_generation;
}

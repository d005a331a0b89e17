//! Coalescence times of lineage samples (T2, T3, T4)

use std::sync::Arc;

use rand::Rng;

use crate::pop::{Lineage, Pop};

/// Coalescence times of `sample_size` sampled lineage pairs
pub fn calc_t2<R: Rng>(p: &Pop, sample_size: usize, rng: &mut R) -> Vec<f64> {
    coal_times(p, sample_size, 2, rng)
}

/// Coalescence times of `sample_size` sampled lineage triples
pub fn calc_t3<R: Rng>(p: &Pop, sample_size: usize, rng: &mut R) -> Vec<f64> {
    coal_times(p, sample_size, 3, rng)
}

/// Coalescence times of `sample_size` sampled lineage quadruples
pub fn calc_t4<R: Rng>(p: &Pop, sample_size: usize, rng: &mut R) -> Vec<f64> {
    coal_times(p, sample_size, 4, rng)
}

/// Sample subsets of `subset_size` frontier nodes without replacement and
/// report each subset's coalescence time in generations
fn coal_times<R: Rng>(p: &Pop, sample_size: usize, subset_size: usize, rng: &mut R) -> Vec<f64> {
    if p.lineages().is_empty() {
        return Vec::new();
    }
    let subset_size = subset_size.min(p.lineages().len());

    (0..sample_size)
        .map(|_| {
            let mut nodes: Vec<Arc<Lineage>> = rand::seq::index::sample(rng, p.lineages().len(), subset_size)
                .iter()
                .map(|i| Arc::clone(&p.lineages()[i]))
                .collect();
            let birth = most_recent_coalescent_time(&mut nodes);
            (p.generation() as i64 - birth as i64 + 1) as f64
        })
        .collect()
}

/// Birth time of the most recent common ancestor of `nodes`
///
/// Direct siblings (same parent node, same birth time) coalesce immediately;
/// otherwise the newest nodes are replaced by their parents and the search
/// repeats. The scratch vector never grows beyond the initial subset.
pub fn most_recent_coalescent_time(nodes: &mut Vec<Arc<Lineage>>) -> u32 {
    loop {
        match nodes.len() {
            0 => return 0,
            1 => return nodes[0].birth_time,
            _ => {}
        }

        let mut earliest: Option<u32> = None;
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                if Lineage::siblings(&nodes[i], &nodes[j]) {
                    let t = nodes[i].birth_time;
                    earliest = Some(earliest.map_or(t, |e| e.min(t)));
                }
            }
        }
        if let Some(t) = earliest {
            return t;
        }

        let newest = nodes.iter().map(|n| n.birth_time).fold(0, u32::max);
        let mut reached_root = false;
        for node in nodes.iter_mut() {
            if node.birth_time == newest {
                match &node.parent {
                    Some(parent) => *node = Arc::clone(parent),
                    None => reached_root = true,
                }
            }
        }
        if reached_root {
            return 0;
        }
    }
}

//! Sampled pairwise diversity (Ks) and its variance

use rand::Rng;

use crate::pop::Pop;
use crate::sim::distr;
use crate::stats::{Mean, Variance};

/// 0/1 profile of the sites where two sequences differ
pub fn diff_profile(a: &[u8], b: &[u8]) -> Vec<f64> {
    a.iter()
        .zip(b)
        .map(|(x, y)| if x != y { 1.0 } else { 0.0 })
        .collect()
}

/// Sample `sample_size` difference profiles with both endpoints drawn from
/// `pops`, populations chosen by size-weighted roulette
pub fn sample_matrix<R: Rng>(sample_size: usize, rng: &mut R, pops: &[&Pop]) -> Vec<Vec<f64>> {
    if pops.is_empty() || pops.iter().all(|p| p.size() == 0) || pops[0].length() == 0 {
        return Vec::new();
    }
    let weights: Vec<f64> = pops.iter().map(|p| p.size() as f64).collect();

    (0..sample_size)
        .map(|_| {
            let p1 = pops[distr::roulette_wheel_select(&weights, rng)];
            let p2 = pops[distr::roulette_wheel_select(&weights, rng)];
            let i = rng.gen_range(0, p1.size());
            let j = rng.gen_range(0, p2.size());
            diff_profile(p1.genomes()[i].seq(), p2.genomes()[j].seq())
        })
        .collect()
}

/// Sample `sample_size` difference profiles with one endpoint in each
/// population
pub fn cross_sample_matrix<R: Rng>(
    sample_size: usize,
    rng: &mut R,
    p1: &Pop,
    p2: &Pop,
) -> Vec<Vec<f64>> {
    if p1.size() == 0 || p2.size() == 0 || p1.length() == 0 || p2.length() == 0 {
        return Vec::new();
    }

    (0..sample_size)
        .map(|_| {
            let i = rng.gen_range(0, p1.size());
            let j = rng.gen_range(0, p2.size());
            diff_profile(p1.genomes()[i].seq(), p2.genomes()[j].seq())
        })
        .collect()
}

/// Mean and population variance of the per-row means of a sample matrix
///
/// `ks` is the average pairwise difference fraction; `vd` is its variance
/// across the sampled pairs. NaN on an empty matrix.
pub fn ks_from_matrix(matrix: &[Vec<f64>]) -> (f64, f64) {
    let mut mean = Mean::new();
    let mut var = Variance::new();
    for row in matrix {
        let mut row_mean = Mean::new();
        for &x in row {
            row_mean.increment(x);
        }
        mean.increment(row_mean.result());
        var.increment(row_mean.result());
    }
    (mean.result(), var.result())
}

/// Sampled pairwise diversity over one or more populations
///
/// Both endpoints of every pair are drawn from the pooled populations,
/// weighted by size.
pub fn calc_ks<R: Rng>(sample_size: usize, rng: &mut R, pops: &[&Pop]) -> (f64, f64) {
    ks_from_matrix(&sample_matrix(sample_size, rng, pops))
}

/// Sampled pairwise diversity between two populations
pub fn cross_ks<R: Rng>(sample_size: usize, rng: &mut R, p1: &Pop, p2: &Pop) -> (f64, f64) {
    ks_from_matrix(&cross_sample_matrix(sample_size, rng, p1, p2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pop::Genome;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn diff_profile_marks_differing_sites() {
        let profile = diff_profile(b"ACGT", b"ACCA");
        assert_eq!(profile, vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn identical_populations_have_zero_diversity() {
        let mut rng = Pcg64::seed_from_u64(81);
        let p = Pop::from_ancestor(&Genome::new(b"ACGTACGT".to_vec()), 10, true);
        let (ks, vd) = calc_ks(200, &mut rng, &[&p]);
        assert_eq!(ks, 0.0);
        assert_eq!(vd, 0.0);
    }

    #[test]
    fn fully_distinct_populations_have_unit_cross_diversity() {
        let mut rng = Pcg64::seed_from_u64(82);
        let p1 = Pop::from_ancestor(&Genome::new(vec![b'A'; 30]), 5, true);
        let p2 = Pop::from_ancestor(&Genome::new(vec![b'C'; 30]), 5, true);
        let (ks, vd) = cross_ks(100, &mut rng, &p1, &p2);
        assert_eq!(ks, 1.0);
        assert_eq!(vd, 0.0);
    }

    #[test]
    fn ks_from_matrix_matches_direct_formulas() {
        // row means: 0.5, 0.25, 0.75
        let matrix = vec![
            vec![1.0, 0.0, 1.0, 0.0],
            vec![1.0, 0.0, 0.0, 0.0],
            vec![1.0, 1.0, 1.0, 0.0],
        ];
        let (ks, vd) = ks_from_matrix(&matrix);

        assert_abs_diff_eq!(ks, 0.5, epsilon = 1e-12);
        // population variance of {0.5, 0.25, 0.75}
        assert_abs_diff_eq!(vd, 0.125 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_inputs_yield_nan() {
        let (ks, vd) = ks_from_matrix(&[]);
        assert!(ks.is_nan());
        assert!(vd.is_nan());
    }
}

//! Correlation profiles of site differences: Cm, Ct, Cr and Cs
//!
//! Per-row autocorrelations run on the worker pool; the reductions are plain
//! sums and therefore order-independent.

use rand::Rng;
use rayon::prelude::*;

use crate::corr::{mask_corr, CorrFft};
use crate::pop::Pop;
use crate::sim::kernels;
use crate::stats::diversity::{cross_sample_matrix, sample_matrix};

/// The four correlation components over lags `[0, max_l)`
///
/// `cs = ct - cr` elementwise, and `ct - cm` equals the diversity variance
/// `vd` at every lag.
#[derive(Clone, Debug, Default)]
pub struct CovProfile {
    /// Mutation correlation: row-mean of per-row autocorrelation minus the
    /// squared row mean
    pub cm: Vec<f64>,
    /// Total correlation: mean autocorrelation minus the squared grand mean
    pub ct: Vec<f64>,
    /// Reference correlation: autocorrelation of the column-average profile
    pub cr: Vec<f64>,
    /// Substitution correlation: `ct - cr`
    pub cs: Vec<f64>,
}

/// Correlation profile of pairs sampled within the pooled `pops`
pub fn calc_cov<R: Rng>(
    sample_size: usize,
    max_l: usize,
    rng: &mut R,
    pops: &[&Pop],
) -> CovProfile {
    let matrix = sample_matrix(sample_size, rng, pops);
    cov_from_matrix(&matrix, max_l, true)
}

/// Correlation profile of pairs sampled across two populations
pub fn cross_cov<R: Rng>(
    sample_size: usize,
    max_l: usize,
    rng: &mut R,
    p1: &Pop,
    p2: &Pop,
) -> CovProfile {
    let matrix = cross_sample_matrix(sample_size, rng, p1, p2);
    cov_from_matrix(&matrix, max_l, true)
}

/// Compute all four components from a sample matrix
///
/// `max_l` is clamped to the row length; an empty matrix produces empty
/// profiles.
pub fn cov_from_matrix(matrix: &[Vec<f64>], max_l: usize, circular: bool) -> CovProfile {
    let (cm, ct) = cm_ct(matrix, max_l, circular);
    if cm.is_empty() {
        return CovProfile::default();
    }

    let average = column_average(matrix);
    let (cr, _) = cm_ct(std::slice::from_ref(&average), max_l, circular);
    let cs = kernels::sub(&ct, &cr);

    CovProfile { cm, ct, cr, cs }
}

/// Mutation and total correlation of a sample matrix via FFT autocorrelation
///
/// Each row's raw autocorrelation is symmetrized and normalized by the
/// matching correlation of an all-ones mask, which corrects for the samples
/// lost to zero padding in the non-circular case.
fn cm_ct(matrix: &[Vec<f64>], max_l: usize, circular: bool) -> (Vec<f64>, Vec<f64>) {
    if matrix.is_empty() || matrix[0].is_empty() || max_l == 0 {
        return (Vec::new(), Vec::new());
    }
    let length = matrix[0].len();
    let max_l = max_l.min(length);

    let corr = CorrFft::new(length, circular);
    let mask = mask_corr(length, circular);

    let rows: Vec<(f64, Vec<f64>)> = matrix
        .par_iter()
        .map(|row| {
            let xy = corr.auto_corr(row);
            let pxy: Vec<f64> = (0..max_l)
                .map(|l| {
                    let mirror = (length - l) % length;
                    (xy[l] + xy[mirror]) / (mask[l] + mask[mirror])
                })
                .collect();
            let mean = row.iter().sum::<f64>() / length as f64;
            (mean, pxy)
        })
        .collect();

    let n = rows.len() as f64;
    let mut sum_pxy = vec![0.0; max_l];
    let mut sum_mean = 0.0;
    let mut sum_mean_sq = 0.0;
    for (mean, pxy) in &rows {
        kernels::add_assign(&mut sum_pxy, pxy);
        sum_mean += mean;
        sum_mean_sq += mean * mean;
    }

    let grand_mean = sum_mean / n;
    let cm = sum_pxy.iter().map(|s| s / n - sum_mean_sq / n).collect();
    let ct = sum_pxy
        .iter()
        .map(|s| s / n - grand_mean * grand_mean)
        .collect();
    (cm, ct)
}

/// The column-wise average profile of a sample matrix
fn column_average(matrix: &[Vec<f64>]) -> Vec<f64> {
    let mut average = vec![0.0; matrix[0].len()];
    for row in matrix {
        kernels::add_assign(&mut average, row);
    }
    let n = matrix.len() as f64;
    for value in &mut average {
        *value /= n;
    }
    average
}

/// Brute-force circular reference for [`cov_from_matrix`]'s Cm/Ct components
#[cfg(test)]
fn cm_ct_brute(matrix: &[Vec<f64>], max_l: usize) -> (Vec<f64>, Vec<f64>) {
    use crate::stats::Mean;

    let length = matrix[0].len();
    let max_l = max_l.min(length);
    let mut cm = Vec::with_capacity(max_l);
    let mut ct = Vec::with_capacity(max_l);

    for l in 0..max_l {
        let mut per_row = Mean::new();
        let mut pooled_xy = Mean::new();
        let mut pooled_x = Mean::new();
        for row in matrix {
            let mut xy = Mean::new();
            let mut x_mean = Mean::new();
            for j in 0..length {
                xy.increment(row[j] * row[(j + l) % length]);
                x_mean.increment(row[j]);
                pooled_xy.increment(row[j] * row[(j + l) % length]);
                pooled_x.increment(row[j]);
            }
            per_row.increment(xy.result() - x_mean.result() * x_mean.result());
        }
        cm.push(per_row.result());
        ct.push(pooled_xy.result() - pooled_x.result() * pooled_x.result());
    }

    (cm, ct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::diversity::ks_from_matrix;
    use rand::Rng as _;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn random_matrix(rows: usize, cols: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut rng = Pcg64::seed_from_u64(seed);
        (0..rows)
            .map(|_| (0..cols).map(|_| rng.gen::<f64>()).collect())
            .collect()
    }

    #[test]
    fn fft_matches_brute_force() {
        let matrix = random_matrix(10, 64, 91);
        let (cm_fast, ct_fast) = cm_ct(&matrix, 64, true);
        let (cm_slow, ct_slow) = cm_ct_brute(&matrix, 64);

        assert_eq!(cm_fast.len(), cm_slow.len());
        for i in 0..64 {
            assert!(
                (cm_fast[i] - cm_slow[i]).abs() < 1e-8,
                "cm differs at {}: {} vs {}",
                i,
                cm_fast[i],
                cm_slow[i]
            );
            assert!(
                (ct_fast[i] - ct_slow[i]).abs() < 1e-8,
                "ct differs at {}: {} vs {}",
                i,
                ct_fast[i],
                ct_slow[i]
            );
        }
    }

    #[test]
    fn decomposition_identities_hold_at_every_lag() {
        let matrix = random_matrix(10, 64, 92);
        let profile = cov_from_matrix(&matrix, 64, true);
        let (_, vd) = ks_from_matrix(&matrix);

        for l in 0..64 {
            assert!(
                (profile.ct[l] - profile.cm[l] - vd).abs() < 1e-8,
                "ct - cm != vd at lag {}",
                l
            );
            assert!(
                (profile.cs[l] - (profile.ct[l] - profile.cr[l])).abs() < 1e-12,
                "cs != ct - cr at lag {}",
                l
            );
        }
    }

    #[test]
    fn max_l_is_clamped_to_the_row_length() {
        let matrix = random_matrix(4, 16, 93);
        let profile = cov_from_matrix(&matrix, 100, true);
        assert_eq!(profile.cm.len(), 16);
        assert_eq!(profile.ct.len(), 16);
        assert_eq!(profile.cr.len(), 16);
        assert_eq!(profile.cs.len(), 16);
    }

    #[test]
    fn empty_matrix_produces_empty_profiles() {
        let profile = cov_from_matrix(&[], 10, true);
        assert!(profile.cm.is_empty());
        assert!(profile.ct.is_empty());
        assert!(profile.cr.is_empty());
        assert!(profile.cs.is_empty());
    }

    #[test]
    fn constant_rows_have_zero_correlation() {
        let matrix = vec![vec![1.0; 32]; 5];
        let profile = cov_from_matrix(&matrix, 32, true);
        for l in 0..32 {
            assert!(profile.cm[l].abs() < 1e-12);
            assert!(profile.ct[l].abs() < 1e-12);
        }
    }
}

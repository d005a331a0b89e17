//! FFT-based auto- and cross-correlation of site profiles
//!
//! The circular variant transforms at the signal length and relies on
//! periodicity; the non-circular variant zero-pads to the next power of two
//! at least twice the signal length. Plans are created once per length and
//! can be shared across threads.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Reusable correlation plans for signals of one fixed length
pub struct CorrFft {
    len: usize,
    fft_len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl CorrFft {
    /// Plan forward and inverse transforms for signals of `len` samples
    pub fn new(len: usize, circular: bool) -> Self {
        debug_assert!(len > 0);
        let fft_len = if circular {
            len
        } else {
            (2 * len).next_power_of_two()
        };
        let mut planner = FftPlanner::new();
        Self {
            len,
            fft_len,
            forward: planner.plan_fft_forward(fft_len),
            inverse: planner.plan_fft_inverse(fft_len),
        }
    }

    /// Signal length the plans were built for
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the plans are for zero-length signals (never, by construction)
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Autocorrelation of `x` at lags `[0, len)`
    pub fn auto_corr(&self, x: &[f64]) -> Vec<f64> {
        self.cross_corr(x, x)
    }

    /// Cross-correlation `r[l] = sum_k x1[k] * x2[k - l]` at lags `[0, len)`
    pub fn cross_corr(&self, x1: &[f64], x2: &[f64]) -> Vec<f64> {
        assert_eq!(x1.len(), self.len);
        assert_eq!(x2.len(), self.len);

        let mut buf1: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); self.fft_len];
        let mut buf2 = buf1.clone();
        for (slot, &v) in buf1.iter_mut().zip(x1) {
            *slot = Complex::new(v, 0.0);
        }
        for (slot, &v) in buf2.iter_mut().zip(x2) {
            *slot = Complex::new(v, 0.0);
        }

        self.forward.process(&mut buf1);
        self.forward.process(&mut buf2);
        for (a, b) in buf1.iter_mut().zip(&buf2) {
            *a *= b.conj();
        }
        self.inverse.process(&mut buf1);

        // the inverse transform is unnormalized
        let scale = 1.0 / self.fft_len as f64;
        buf1.iter().take(self.len).map(|c| c.re * scale).collect()
    }
}

/// Autocorrelation of the all-ones mask: the per-lag sample counts that
/// normalize a raw correlation
///
/// Every lag sees the full length on a circular signal; zero padding loses
/// one sample per lag otherwise.
pub fn mask_corr(len: usize, circular: bool) -> Vec<f64> {
    if circular {
        vec![len as f64; len]
    } else {
        (0..len).map(|l| (len - l) as f64).collect()
    }
}

/// Brute-force reference for [`CorrFft::auto_corr`]
pub fn auto_corr_brute(x: &[f64], circular: bool) -> Vec<f64> {
    cross_corr_brute(x, x, circular)
}

/// Brute-force reference for [`CorrFft::cross_corr`]
pub fn cross_corr_brute(x1: &[f64], x2: &[f64], circular: bool) -> Vec<f64> {
    let len = x1.len();
    assert_eq!(x2.len(), len);

    if circular {
        (0..len)
            .map(|l| {
                (0..len)
                    .map(|k| x1[k] * x2[(k + len - l) % len])
                    .sum::<f64>()
            })
            .collect()
    } else {
        // zero-padded to twice the length, as the transform does
        let padded = 2 * len;
        (0..len)
            .map(|l| {
                (0..len)
                    .filter(|&k| (k + padded - l) % padded < len)
                    .map(|k| x1[k] * x2[(k + padded - l) % padded])
                    .sum::<f64>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    const TOLERANCE: f64 = 1e-5;

    #[test]
    fn auto_corr_matches_known_values() {
        let data = [
            0.1576, 0.9706, 0.9572, 0.4854, 0.8003, 0.1419, 0.4218, 0.9157, 0.7922, 0.9595,
        ];
        let expected = [
            5.34401, 3.98031, 3.13718, 2.4438, 1.88223, 2.46069, 2.17929, 1.83166, 1.05614,
            0.151217,
        ];

        let corr = CorrFft::new(data.len(), false);
        let res1 = auto_corr_brute(&data, false);
        let res2 = corr.auto_corr(&data);

        assert_eq!(res1.len(), res2.len());
        for i in 0..expected.len() {
            assert!((res1[i] - res2[i]).abs() < TOLERANCE);
            assert!(
                (res1[i] - expected[i]).abs() < TOLERANCE,
                "expected {} got {} at {}",
                expected[i],
                res1[i],
                i
            );
        }
    }

    #[test]
    fn cross_corr_matches_known_values() {
        let data1 = [
            0.6557, 0.0357, 0.8491, 0.9340, 0.6787, 0.7577, 0.7431, 0.3922, 0.6555, 0.1712,
        ];
        let data2 = [
            0.1576, 0.9706, 0.9572, 0.4854, 0.8003, 0.1419, 0.4218, 0.9157, 0.7922, 0.9595,
        ];
        let expected = [
            3.41092, 3.86624, 3.40214, 2.79604, 3.00792, 2.27675, 1.87809, 1.44342, 0.5537,
            0.629144,
        ];

        let corr = CorrFft::new(data1.len(), false);
        let res1 = corr.cross_corr(&data2, &data1);
        let res2 = cross_corr_brute(&data2, &data1, false);

        assert_eq!(res1.len(), res2.len());
        for i in 0..expected.len() {
            assert!((res1[i] - res2[i]).abs() < TOLERANCE);
            assert!(
                (res2[i] - expected[i]).abs() < TOLERANCE,
                "expected {} got {} at {}",
                expected[i],
                res2[i],
                i
            );
        }
    }

    #[test]
    fn fft_agrees_with_brute_force_on_random_inputs() {
        let mut rng = Pcg64::seed_from_u64(71);
        for &len in &[2usize, 10, 100, 257, 1024] {
            let x: Vec<f64> = (0..len).map(|_| rng.gen::<f64>()).collect();
            for &circular in &[true, false] {
                let corr = CorrFft::new(len, circular);
                let fast = corr.auto_corr(&x);
                let slow = auto_corr_brute(&x, circular);
                for (i, (a, b)) in fast.iter().zip(&slow).enumerate() {
                    assert!(
                        (a - b).abs() < TOLERANCE,
                        "len {} circular {} lag {}: {} vs {}",
                        len,
                        circular,
                        i,
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn mask_counts_samples_per_lag() {
        assert_eq!(mask_corr(4, true), vec![4.0; 4]);
        assert_eq!(mask_corr(4, false), vec![4.0, 3.0, 2.0, 1.0]);
    }
}

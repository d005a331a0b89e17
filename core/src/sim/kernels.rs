//! Performance sensitive computational kernels for the statistics reductions

use itertools::izip;
use slices_dispatch_wide::slices_dispatch_wide;

/// Accumulate `x` into `acc` elementwise
pub fn add_assign(acc: &mut [f64], x: &[f64]) {
    assert_eq!(acc.len(), x.len());

    slices_dispatch_wide!(4, |acc => a mut: f64, x => v: f64| {
        a += v;
    });
}

/// Elementwise difference `a - b` as a new vector
pub fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    assert_eq!(a.len(), b.len());

    izip!(a, b).map(|(x, y)| x - y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assign_accumulates() {
        let mut acc = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        add_assign(&mut acc, &[0.5; 5]);
        add_assign(&mut acc, &[0.25; 5]);
        assert_eq!(acc, vec![1.75, 2.75, 3.75, 4.75, 5.75]);
    }

    #[test]
    fn sub_is_elementwise() {
        assert_eq!(sub(&[3.0, 2.0], &[1.0, 0.5]), vec![2.0, 1.5]);
    }
}

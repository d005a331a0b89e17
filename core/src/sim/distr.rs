//! Sample random variates from the distributions the event stream needs

use rand::prelude::*;

/// Sample a Poisson event count with the given `mean` using the provided
/// `rng`
///
/// The typical caller draws the size of one auxiliary burst, whose mean is
/// small and fixed per engine, so constructing a `rand_distr` sampler per
/// draw is wasted work there. Panics on a negative mean.
pub fn poisson<R: Rng>(mean: f64, rng: &mut R) -> u64 {
    assert!(mean >= 0.0, "Poisson called with negative mean");
    if mean <= 10.0 {
        burst_count(mean, rng)
    } else {
        // the product method needs ~mean uniforms, so hand larger means to
        // rand_distr's rejection sampler
        rand_distr::Poisson::new(mean).unwrap().sample(rng)
    }
}

/// Poisson counting by Knuth's product method (TAOCP vol. 2, 3.4.1)
///
/// A unit-rate arrival consumes one uniform factor; the count is how many
/// arrivals fit before the running product falls to `exp(-mean)`.
fn burst_count<R: Rng>(mean: f64, rng: &mut R) -> u64 {
    let floor = (-mean).exp();
    let mut events = 0;
    let mut product = rng.gen::<f64>();
    while product >= floor {
        events += 1;
        product *= rng.gen::<f64>();
    }
    events
}

/// Sample an exponential variate with the given `mean`
pub fn exponential<R: Rng>(mean: f64, rng: &mut R) -> f64 {
    rand_distr::Exp::new(mean.recip()).unwrap().sample(rng)
}

/// Sample a zero-centered gaussian variate with scale `sigma`
pub fn gaussian<R: Rng>(sigma: f64, rng: &mut R) -> f64 {
    rand_distr::Normal::new(0.0, sigma).unwrap().sample(rng)
}

/// Sample a gamma variate with the given `shape` and `scale`
pub fn gamma<R: Rng>(shape: f64, scale: f64, rng: &mut R) -> f64 {
    rand_distr::Gamma::new(shape, scale).unwrap().sample(rng)
}

/// Roulette-wheel selection over a slice of non-negative weights
///
/// Returns the smallest index `i` such that the accumulated weight up to and
/// including `i`, as a fraction of the total, reaches a uniform draw from
/// `[0, 1)`. A zero total weight selects index 0.
pub fn roulette_wheel_select<R: Rng>(weights: &[f64], rng: &mut R) -> usize {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0;
    }

    let v = rng.gen::<f64>();
    let mut accum = 0.0;
    for (i, w) in weights.iter().enumerate() {
        accum += w;
        if accum / total >= v {
            return i;
        }
    }

    0
}

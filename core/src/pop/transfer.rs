//! Horizontal transfer operators and fragment-length generators

use rand::Rng;

use crate::pop::{Genome, Pop};
use crate::sim::distr;

/// Generator of transferred fragment lengths
#[derive(Clone, Copy, Debug)]
pub enum FragSize {
    /// Always the same length
    Constant(usize),
    /// Floor of an exponential variate with the given mean
    Exponential {
        /// Mean fragment length
        mean: f64,
    },
}

impl FragSize {
    /// Draw the length of the next fragment
    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        match *self {
            FragSize::Constant(length) => length,
            FragSize::Exponential { mean } => distr::exponential(mean, rng) as usize,
        }
    }
}

/// Transfer a fragment between two genomes of the same population
///
/// Donor and receiver slots are drawn uniformly; equal slots are a no-op. The
/// fragment start is uniform in `[0, L)` and its length comes from `frag`,
/// clamped to the genome length. A fragment running past the end wraps around
/// on a circular genome and is clipped otherwise.
pub fn transfer_within<R: Rng>(p: &mut Pop, frag: &FragSize, rng: &mut R) {
    let n = p.size();
    if n == 0 || p.length() == 0 {
        return;
    }
    let a = rng.gen_range(0, n);
    let b = rng.gen_range(0, n);
    if a == b {
        return;
    }

    let length = p.length();
    let start = rng.gen_range(0, length);
    let size = frag.sample(rng).min(length);
    let circular = p.circular();

    let (donor, receiver) = donor_receiver(&mut p.genomes, a, b);
    copy_fragment(donor.seq(), receiver.seq_mut(), start, size, circular);
}

/// Transfer a fragment from a donor population into a receiver population
///
/// The donor genome is drawn uniformly from `donor`, the receiver genome
/// uniformly from `p`; wrap/clip behavior follows the receiver's circular
/// flag.
pub fn transfer_between<R: Rng>(p: &mut Pop, donor: &Pop, frag: &FragSize, rng: &mut R) {
    if p.size() == 0 || donor.size() == 0 || p.length() == 0 {
        return;
    }
    let a = rng.gen_range(0, donor.size());
    let b = rng.gen_range(0, p.size());

    let length = p.length();
    let start = rng.gen_range(0, length);
    let size = frag.sample(rng).min(length);
    let circular = p.circular();

    copy_fragment(
        donor.genomes()[a].seq(),
        p.genomes[b].seq_mut(),
        start,
        size,
        circular,
    );
}

/// Split `genomes` into a shared donor reference and a mutable receiver
fn donor_receiver(genomes: &mut [Genome], donor: usize, receiver: usize) -> (&Genome, &mut Genome) {
    debug_assert_ne!(donor, receiver);
    if donor < receiver {
        let (head, tail) = genomes.split_at_mut(receiver);
        (&head[donor], &mut tail[0])
    } else {
        let (head, tail) = genomes.split_at_mut(donor);
        (&tail[0], &mut head[receiver])
    }
}

/// Copy `[start, start + size)` of `donor` into `receiver`, wrapping past the
/// end when `circular` and clipping otherwise
fn copy_fragment(donor: &[u8], receiver: &mut [u8], start: usize, size: usize, circular: bool) {
    let length = receiver.len();
    let end = start + size;
    if end < length {
        receiver[start..end].copy_from_slice(&donor[start..end]);
    } else {
        receiver[start..].copy_from_slice(&donor[start..]);
        if circular {
            let wrapped = end - length;
            receiver[..wrapped].copy_from_slice(&donor[..wrapped]);
        }
    }
}
